//! Timeline widget events.

#[derive(Clone, Debug)]
pub struct TimelineZoomInEvent;

#[derive(Clone, Debug)]
pub struct TimelineZoomOutEvent;

#[derive(Clone, Debug)]
pub struct TimelineZoomResetEvent;
