pub mod dispatch_service;
pub mod match_service;
pub mod reply_service;
pub mod request_service;
pub mod sms_gateway;
