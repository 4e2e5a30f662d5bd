pub mod generate;
pub mod onboard;
pub mod serve;
pub mod status;
