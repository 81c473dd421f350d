pub mod astronomy;
pub mod cache;
pub mod ipgeo;
pub mod mapper;
pub mod provider;
pub mod refresh;
pub mod wall_clock;
