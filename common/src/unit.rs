//! Marker types.

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity deactivation.
#[derive(Clone, Copy, Debug)]
pub struct Deactivation;

/// Marker type describing a beginning of some time window.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing an ending of some time window.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// Marker type describing an entrance into some place.
#[derive(Clone, Copy, Debug)]
pub struct Entry;

/// Marker type describing a leaving of some place.
#[derive(Clone, Copy, Debug)]
pub struct Exit;

/// Marker type describing an entity cancellation.
#[derive(Clone, Copy, Debug)]
pub struct Cancellation;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// Marker type describing an entity rating.
#[derive(Clone, Copy, Debug)]
pub struct Rating;
