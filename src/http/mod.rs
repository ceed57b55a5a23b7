pub mod multipart;
pub mod request;
pub mod response;

pub use request::HttpRequest;
pub use response::HttpResponse;
