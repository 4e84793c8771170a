pub mod db_setup;
pub mod seed_data;
