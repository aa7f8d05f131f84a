pub mod actor;
pub mod doc_number;
pub mod request;
