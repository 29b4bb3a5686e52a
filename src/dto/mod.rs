pub mod matchmaker_dto;
pub mod sms_dto;
