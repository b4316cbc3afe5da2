pub mod anti_cheat_service;
pub mod assignment_service;
pub mod photo_service;
pub mod session_service;
pub mod time_anomaly;
