#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use sf_codec as codec;
pub use sf_model as model;
pub use sf_registry as registry;
