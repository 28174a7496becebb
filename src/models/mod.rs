pub mod activity;
pub mod garmin;
pub mod recovery;

pub use activity::Activity;
pub use garmin::{GarminActivity, GarminSleep};
pub use recovery::DailyWellness;
