//! Output generation for blog posts.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2024-06-01-AI-The-Future-2024.md
//! └── 2024-06-02-Rust-in-the-Linux-kernel.md
//! ```
//!
//! One markdown file per generated post. Names are derived from the local
//! date and the story title, so a second post about the same title on the
//! same day overwrites the first.

pub mod post;
