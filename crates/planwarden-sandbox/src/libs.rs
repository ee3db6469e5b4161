//! Catalog of standard libraries a sandbox may open.
//!
//! The base library is always opened first. The configured names form an
//! unordered set opened after it in catalog order; naming `base` explicitly
//! is allowed and has no further effect.

use crate::error::SandboxError;
use rhai::Engine;
use rhai::packages::{
    BasicArrayPackage, BasicMapPackage, BasicMathPackage, BasicTimePackage, BitFieldPackage,
    CorePackage, MoreStringPackage, Package,
};

pub const BASE_LIB: &str = "base";

/// One openable library.
pub struct StandardLib {
    pub name: &'static str,
    pub description: &'static str,
    open: fn(&mut Engine),
}

impl StandardLib {
    pub fn open(&self, engine: &mut Engine) {
        (self.open)(engine);
    }
}

pub const CATALOG: &[StandardLib] = &[
    StandardLib {
        name: BASE_LIB,
        description: "core language functions, always opened",
        open: |engine| {
            engine.register_global_module(CorePackage::new().as_shared_module());
        },
    },
    StandardLib {
        name: "table",
        description: "array and object-map functions",
        open: |engine| {
            engine.register_global_module(BasicArrayPackage::new().as_shared_module());
            engine.register_global_module(BasicMapPackage::new().as_shared_module());
        },
    },
    StandardLib {
        name: "string",
        description: "string manipulation",
        open: |engine| {
            engine.register_global_module(MoreStringPackage::new().as_shared_module());
        },
    },
    StandardLib {
        name: "math",
        description: "numeric functions and conversions",
        open: |engine| {
            engine.register_global_module(BasicMathPackage::new().as_shared_module());
        },
    },
    StandardLib {
        name: "bits",
        description: "bit-field access on integers",
        open: |engine| {
            engine.register_global_module(BitFieldPackage::new().as_shared_module());
        },
    },
    StandardLib {
        name: "time",
        description: "timestamps and elapsed time",
        open: |engine| {
            engine.register_global_module(BasicTimePackage::new().as_shared_module());
        },
    },
];

pub fn default_libs() -> Vec<String> {
    ["table", "string", "math"].map(String::from).to_vec()
}

pub fn lookup(name: &str) -> Option<&'static StandardLib> {
    CATALOG.iter().find(|lib| lib.name == name)
}

/// Resolve configured names into the order they are opened in.
pub fn opening_order(requested: &[String]) -> Result<Vec<&'static StandardLib>, SandboxError> {
    if let Some(unknown) = requested.iter().find(|name| lookup(name).is_none()) {
        return Err(SandboxError::UnknownLibrary(unknown.clone()));
    }
    Ok(CATALOG
        .iter()
        .filter(|lib| lib.name == BASE_LIB || requested.iter().any(|name| name == lib.name))
        .collect())
}
