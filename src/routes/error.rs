use crate::error::app_error::ErrorBody;
use rocket::serde::json::Json;
use rocket::{Request, catch, catchers};

// Guards that fail before a handler runs land here; the bodies match AppError's.

#[catch(400)]
pub fn bad_request(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Bad request"))
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Unauthorized"))
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Not found"))
}

#[catch(409)]
pub fn conflict(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Conflict"))
}

#[catch(413)]
pub fn payload_too_large(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Payload too large"))
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Malformed request body"))
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<ErrorBody> {
    Json(ErrorBody::new("Internal server error"))
}

pub fn catchers() -> Vec<rocket::Catcher> {
    catchers![bad_request, unauthorized, not_found, conflict, payload_too_large, unprocessable_entity, internal_error]
}
