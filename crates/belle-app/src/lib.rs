// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod forms;
pub mod ids;
pub mod listing;
pub mod model;
pub mod session;
pub mod state;
pub mod validation;

pub use forms::*;
pub use ids::*;
pub use listing::*;
pub use model::*;
pub use session::*;
pub use state::*;
