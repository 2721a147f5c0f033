pub mod network;
pub mod opf;
pub mod sensitivity;
pub mod util;
