pub mod pupil;
pub mod pupil_tutor_match;
pub mod request_for_tutor;
pub mod request_sms;
pub mod subject;
pub mod tutor;
