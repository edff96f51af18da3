/// Type-state markers for the session builder
///
/// These types track which required fields have been set at
/// compile-time, preventing invalid configurations.
use std::marker::PhantomData;

/// Marker trait for endpoint state
pub trait EndpointState {}

/// Endpoint has not been set
pub struct NoEndpoint;
impl EndpointState for NoEndpoint {}

/// Endpoint has been set
pub struct HasEndpoint;
impl EndpointState for HasEndpoint {}

/// Marker trait for identity state
pub trait IdentityState {}

/// Identity has not been set
pub struct NoIdentity;
impl IdentityState for NoIdentity {}

/// Identity has been set
pub struct HasIdentity;
impl IdentityState for HasIdentity {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<E, I> {
    _endpoint: PhantomData<E>,
    _identity: PhantomData<I>,
}

impl<E, I> TypeState<E, I> {
    pub(crate) fn new() -> Self {
        Self {
            _endpoint: PhantomData,
            _identity: PhantomData,
        }
    }
}

impl<E, I> Default for TypeState<E, I> {
    fn default() -> Self {
        Self::new()
    }
}
