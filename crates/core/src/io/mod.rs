//! GeoTIFF reading and writing

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_stack_geotiff, write_stack_geotiff_to_buffer,
    GeoTiffReadOptions,
};
