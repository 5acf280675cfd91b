//! Core systems for Horizon Trellis.
//!
//! This crate provides the lifecycle engine that declarative views are bridged
//! onto:
//!
//! - **Scene**: an arena of views with parent-child links, frames, visibility
//!   and per-view payloads
//! - **Render tracker**: monotonic `NotRendered < Rendered < InTheScene`
//!   milestones with one-shot callbacks
//! - **Appear / Layout / Trait trackers**: persistent callbacks delivered by
//!   self-implemented views to their composite subtrees
//! - **Render manager**: the native lifecycle hooks that drive the trackers
//! - **Main queue**: zero-delay deferred work, one turn at a time
//! - **Reactive values**: `Signal` and `Value` with directly-owned observers
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use horizon_trellis_core::{Rect, Scene, ViewKind};
//!
//! let mut scene = Scene::new();
//! let window = scene.create_window(Rect::new(0.0, 0.0, 320.0, 480.0));
//! let badge = scene.create_view(ViewKind::Native);
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let l = log.clone();
//! scene.on_in_the_scene(badge, move |_, _| l.borrow_mut().push("in the scene"));
//! let l = log.clone();
//! scene.on_appear(badge, move |_, _| l.borrow_mut().push("appeared"));
//!
//! scene.set_frame(badge, Rect::new(0.0, 0.0, 24.0, 24.0)).unwrap();
//! scene.add_subview(window, badge).unwrap();
//!
//! assert_eq!(*log.borrow(), vec!["in the scene", "appeared"]);
//! ```

pub mod appear;
mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod manager;
pub mod queue;
pub mod reactive;
pub mod render;
mod scene;
pub mod thread_check;
pub mod traits;
pub mod view;

pub use appear::{AppearState, ViewCallback};
pub use error::{Result, SceneError};
pub use geometry::{Point, Rect, Size};
pub use logging::{SceneTreeDebug, TreeFormatOptions, TreeStyle};
pub use manager::RenderManager;
pub use queue::{MainQueue, Task, TaskId};
pub use reactive::{ConnectionId, Signal, Subscription, Value};
pub use render::{RenderCallback, RenderState};
pub use scene::Scene;
pub use thread_check::{is_main_thread, set_main_thread, ThreadAffinity};
pub use traits::{
    ContentSizeCategory, InterfaceStyle, SizeClass, TraitCallback, TraitCollection,
};
pub use view::{ViewId, ViewKind};
