pub mod estimate;
pub mod routes;
