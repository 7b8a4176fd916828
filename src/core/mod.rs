pub mod authorization_request;
pub mod input_descriptor;
pub mod iso_18013_7;
pub mod metadata;
pub mod object;
pub mod presentation_definition;
pub mod presentation_submission;
pub mod response;
pub mod util;
