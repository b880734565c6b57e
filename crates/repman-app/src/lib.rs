// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod catalog;
pub mod controls;
pub mod events;
pub mod generate;
pub mod headless;
pub mod host;
pub mod ids;
pub mod layout;
pub mod model;
pub mod picker;
pub mod registry;
pub mod session;
pub mod tabs;
pub mod viewer;

pub use catalog::{MetadataStore, load_catalog};
pub use events::{EventAdapter, HostEvent, RawEventKind, RawHostEvent};
pub use generate::{ArtifactResolver, DEFAULT_EXTENSION, GenerateError};
pub use headless::MemoryHost;
pub use host::{ControlValue, HostSurface, StatusKind, StatusMessage};
pub use ids::*;
pub use model::*;
pub use registry::*;
pub use session::{REPORT_OPENED, Session, SessionConfig};
pub use viewer::{RenderOutcome, ReportRenderer, ViewerLauncher};
