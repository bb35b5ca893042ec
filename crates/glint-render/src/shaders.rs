//! Built-in WGSL programs.
//!
//! Pipelines name their program; backends resolve the name to source with
//! [`program_source`]. Every program has `vs_main` and `fs_main` entry points
//! and reads the frame globals from group 0, binding 0.

pub const ATLAS_PROGRAM: &str = "atlas";
pub const PRIMITIVE_PROGRAM: &str = "primitive";
pub const TEXT_PROGRAM: &str = "text";

pub const PROGRAMS: [&str; 3] = [ATLAS_PROGRAM, PRIMITIVE_PROGRAM, TEXT_PROGRAM];

/// Size of the `Globals` uniform block shared by all programs.
pub const GLOBALS_SIZE: u64 = 80;

pub fn program_source(name: &str) -> Option<&'static str> {
    match name {
        ATLAS_PROGRAM => Some(include_str!("shaders/atlas.wgsl")),
        PRIMITIVE_PROGRAM => Some(include_str!("shaders/primitive.wgsl")),
        TEXT_PROGRAM => Some(include_str!("shaders/text.wgsl")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_program_has_entry_points() {
        for name in PROGRAMS {
            let source = program_source(name).unwrap();
            assert!(source.contains("fn vs_main"), "{} lacks vs_main", name);
            assert!(source.contains("fn fs_main"), "{} lacks fs_main", name);
            assert!(source.contains("var<uniform> globals: Globals"));
        }
    }

    #[test]
    fn test_unknown_program() {
        assert!(program_source("blit").is_none());
    }
}
