mod progress;
mod view;

pub use progress::{elapsed_between, format_elapsed, ProgressModel};
pub use view::{ResultView, SentimentView, TrackerView};
