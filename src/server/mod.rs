//! TCP transport: binds the listener and runs one task per connection.

pub mod listener;
