pub mod answer;
pub mod assignment;
pub mod detection;
pub mod owner;
pub mod participant;
pub mod photo;
pub mod public_user;
pub mod session;
pub mod session_event;
pub mod test;
