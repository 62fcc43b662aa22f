//! Crate-local macros.

/// Lets a handler extract one field of [`AppState`](crate::state::AppState)
/// directly with `State<T>`.
///
/// # Example
/// ```ignore
/// impl_from_ref!(Arc<TicketService>, tickets);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Arc<TicketService> {
///     fn from_ref(state: &AppState) -> Self {
///         state.tickets.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
