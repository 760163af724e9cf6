//! Core library for the gumruk-tools command line application.
//!
//! The library converts customs declaration XML documents into Excel
//! workbooks. The XML reader lives under [`gumruk::tools::io`], the generic
//! section flattening logic in [`gumruk::tools::flatten`], the declared
//! section layouts per document kind in [`gumruk::tools::layout`], and the
//! conversion orchestration under [`gumruk::tools::sync`].

pub mod gumruk;

pub use gumruk::tools::{
    Result, ToolError, error, flatten, index, io, layout, logging, model, sync, workspace,
};
