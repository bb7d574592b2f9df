/// Defines a wrapper type around an actor handle.
///
/// ```ignore
/// define_actor! {
///     /// A chat session.
///     pub struct Session(SessionState);
/// }
/// ```
///
/// The wrapper gets a private `spawn(state, label)` constructor and a
/// private `handle()` accessor, so that the public surface is whatever the
/// `impl` blocks of the wrapper expose.
#[macro_export]
macro_rules! define_actor {
    {
        $(#[$attr:meta])*
        $v:vis struct $wrapper_type:ident($state_type:ty);
    } => {
        $(#[$attr])*
        $v struct $wrapper_type {
            handle: $crate::Actor<$state_type>,
        }

        #[allow(dead_code)]
        impl $wrapper_type {
            #[inline]
            fn spawn(state: $state_type, label: &str) -> Self {
                Self {
                    handle: $crate::Actor::spawn(state, label),
                }
            }

            #[inline]
            fn handle(&self) -> &$crate::Actor<$state_type> {
                &self.handle
            }
        }

        impl ::std::clone::Clone for $wrapper_type {
            #[inline]
            fn clone(&self) -> Self {
                Self {
                    handle: ::std::clone::Clone::clone(&self.handle),
                }
            }
        }
    };
}
