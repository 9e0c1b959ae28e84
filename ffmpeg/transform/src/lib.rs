/*!
    Frame transformation for the capture pipeline.

    For audio: a resampler that converts decoded frames to the encoder's
    sample format, rate and channel count, and a FIFO that reshapes the
    variable-length resampler output into fixed-size encoder frames.

    For video: conversion of a decoded picture to YUV 4:2:0 and from there to
    packed RGB for thumbnail encoding.
*/

mod fifo;
mod resample;
mod video;

pub use fifo::AudioFifo;
pub use resample::{ResampleTarget, Resampler};
pub use video::{VideoTransform, yuv420p_to_rgb};
