//! End-to-end compose flow: manifest stream -> registry -> composite PNG

use image::{Rgba, RgbaImage};
use spritestack::compositor::compose;
use spritestack::models::StackObject;
use spritestack::output::{artifact_output_path, save_png};
use spritestack::parser::parse_stream;
use spritestack::registry::LayerRegistry;
use std::io::Cursor;
use tempfile::tempdir;

/// Build a registry from a manifest string, registering categories and
/// layers the way the CLI does.
fn registry_from_manifest(manifest: &str) -> LayerRegistry {
    let result = parse_stream(Cursor::new(manifest));
    assert!(result.warnings.is_empty(), "unexpected parse warnings");

    let mut registry = LayerRegistry::new();
    for obj in result.objects {
        match obj {
            StackObject::Category(category) => registry.register_category(category),
            StackObject::Layer(layer) => registry.add_layer(layer),
        }
    }
    registry.sort_by_rank();
    registry
}

#[test]
fn test_manifest_to_named_png() {
    let dir = tempdir().unwrap();

    // base: solid blue 16x16; eyes: one red pixel at (3,3), rest transparent
    let base = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 255, 255]));
    base.save(dir.path().join("base.png")).unwrap();
    let mut eyes = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
    eyes.put_pixel(3, 3, Rgba([255, 0, 0, 255]));
    eyes.save(dir.path().join("eyes1.png")).unwrap();

    let manifest = r#"{"type": "category", "name": "skin", "can_disable": false}
{"type": "category", "name": "eyes"}
{"type": "layer", "name": "base", "category": "skin", "image": "base.png", "show": true}
{"type": "layer", "name": "eyes1", "category": "eyes", "image": "eyes1.png", "show": true}"#;

    let registry = registry_from_manifest(manifest);
    let visible = registry.visible_snapshot();
    assert_eq!(visible.len(), 2);

    let composite = compose(&visible, dir.path()).unwrap();
    let output_path = artifact_output_path("hero", "png", Some(dir.path()));
    save_png(&composite, &output_path).unwrap();

    // One PNG named hero.png, 16x16, eyes painted over base
    assert_eq!(output_path.file_name().unwrap(), "hero.png");
    let exported = image::open(&output_path).unwrap().to_rgba8();
    assert_eq!(exported.dimensions(), (16, 16));
    assert_eq!(*exported.get_pixel(3, 3), Rgba([255, 0, 0, 255]));
    assert_eq!(*exported.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
}

#[test]
fn test_hidden_layers_stay_out_of_the_composite() {
    let dir = tempdir().unwrap();

    let base = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255]));
    base.save(dir.path().join("base.png")).unwrap();
    let overlay = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    overlay.save(dir.path().join("overlay.png")).unwrap();

    let manifest = r#"{"type": "category", "name": "skin", "can_disable": false}
{"type": "category", "name": "torso"}
{"type": "layer", "name": "base", "category": "skin", "image": "base.png", "show": true}
{"type": "layer", "name": "overlay", "category": "torso", "image": "overlay.png"}"#;

    let registry = registry_from_manifest(manifest);
    let composite = compose(&registry.visible_snapshot(), dir.path()).unwrap();
    assert_eq!(*composite.get_pixel(2, 2), Rgba([0, 255, 0, 255]));
}

#[test]
fn test_selection_switch_changes_export() {
    let dir = tempdir().unwrap();

    let base = RgbaImage::from_pixel(2, 2, Rgba([10, 10, 10, 255]));
    base.save(dir.path().join("base.png")).unwrap();
    let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
    red.save(dir.path().join("eyes-red.png")).unwrap();
    let green = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
    green.save(dir.path().join("eyes-green.png")).unwrap();

    let manifest = r#"{"type": "category", "name": "skin", "can_disable": false}
{"type": "category", "name": "eyes"}
{"type": "layer", "name": "base", "category": "skin", "image": "base.png", "show": true}
{"type": "layer", "name": "eyes-red", "category": "eyes", "image": "eyes-red.png", "show": true}
{"type": "layer", "name": "eyes-green", "category": "eyes", "image": "eyes-green.png"}"#;

    let mut registry = registry_from_manifest(manifest);

    let composite = compose(&registry.visible_snapshot(), dir.path()).unwrap();
    assert_eq!(*composite.get_pixel(0, 0), Rgba([255, 0, 0, 255]));

    // Exclusive selection flips the category to the other layer
    assert!(registry.set_visible(Some("eyes-green"), "eyes"));
    let composite = compose(&registry.visible_snapshot(), dir.path()).unwrap();
    assert_eq!(*composite.get_pixel(0, 0), Rgba([0, 255, 0, 255]));

    let visible_eyes = registry
        .visible_snapshot()
        .iter()
        .filter(|l| l.category == "eyes")
        .count();
    assert_eq!(visible_eyes, 1);
}

#[test]
fn test_compose_fails_when_nothing_is_visible() {
    let dir = tempdir().unwrap();
    let manifest = r#"{"type": "category", "name": "eyes"}
{"type": "layer", "name": "eyes1", "category": "eyes", "image": "eyes1.png"}"#;

    let registry = registry_from_manifest(manifest);
    let result = compose(&registry.visible_snapshot(), dir.path());
    assert!(result.is_err());
}
