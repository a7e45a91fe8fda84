//! Media codecs used by the asset stages

pub mod audio;
pub mod imaging;

pub use audio::PcmAudio;
