pub mod prediction_history;
