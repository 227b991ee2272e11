/// Image decoding module
///
/// This module handles:
/// - Generating encoded thumbnails for image items

pub mod thumbnail;
