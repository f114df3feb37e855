pub mod geo_transform;
pub mod raster_metadata;
