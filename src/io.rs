pub mod logger;
pub mod write_to_csv;
pub mod write_to_txt;
