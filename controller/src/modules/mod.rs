pub mod call_handler;
pub mod car_handler;
