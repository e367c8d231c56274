use approx::assert_relative_eq;
use fracture_mesh::conversion::set_unset_colors;
use fracture_mesh::math::{Color, Isometry3, Point3};
use fracture_mesh::shape::{is_unset_color, GeometryCollection, UNSET_VERTEX_COLOR};

const LENGTH: u32 = 4;

/// An unset strip of quads along `x`, with a red triangle touching its `x = 0`
/// end and a blue triangle touching its `x = LENGTH` end.
fn strip_between_colors() -> GeometryCollection {
    let mut collection = GeometryCollection::new();
    let vertices: Vec<_> = (0..=LENGTH)
        .flat_map(|i| [Point3::new(i as f32, 0.0, 0.0), Point3::new(i as f32, 1.0, 0.0)])
        .collect();
    let indices: Vec<_> = (0..LENGTH)
        .flat_map(|i| {
            let (a, b, c, d) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
            [[a, c, d], [a, d, b]]
        })
        .collect();
    let _ = collection
        .append_geometry(Isometry3::identity(), None, &vertices, &indices, UNSET_VERTEX_COLOR)
        .unwrap();

    let end = LENGTH as f32;
    let red = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    let blue = [
        Point3::new(end, 0.0, 0.0),
        Point3::new(end, 1.0, 0.0),
        Point3::new(end + 1.0, 0.0, 0.0),
    ];
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &red,
            &[[0, 1, 2]],
            Color::new(1.0, 0.0, 0.0, 1.0),
        )
        .unwrap();
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &blue,
            &[[0, 1, 2]],
            Color::new(0.0, 0.0, 1.0, 1.0),
        )
        .unwrap();
    collection
}

#[test]
fn two_colors_blend_along_the_strip() {
    let mut collection = strip_between_colors();
    set_unset_colors(&mut collection, 0, true);

    let num_strip_vertices = collection.vertex_count[0];
    let strip = &collection.colors[..num_strip_vertices];
    assert!(strip.iter().all(|color| !is_unset_color(color)));

    for color in strip {
        // Both boundary conditions sum to white, so the solutions do too.
        assert_relative_eq!(color.x + color.z, 1.0, epsilon = 1.0e-4);
        assert_relative_eq!(color.y, 0.0, epsilon = 1.0e-4);
        assert_relative_eq!(color.w, 1.0, epsilon = 1.0e-4);
    }

    // Ends copy the colors they touch.
    assert_relative_eq!(strip[0], Color::new(1.0, 0.0, 0.0, 1.0), epsilon = 1.0e-4);
    let last = 2 * LENGTH as usize + 1;
    assert_relative_eq!(strip[last], Color::new(0.0, 0.0, 1.0, 1.0), epsilon = 1.0e-4);

    // Red fades out along the strip.
    let red_at = |column: usize| strip[2 * column].x + strip[2 * column + 1].x;
    assert!(red_at(1) > red_at(2));
    assert!(red_at(2) > red_at(3));
}

#[test]
fn colors_are_only_written_from_the_first_geometry_on() {
    let mut collection = strip_between_colors();
    let first_blue = collection.vertex_start[2];
    collection.colors[first_blue] = UNSET_VERTEX_COLOR;

    set_unset_colors(&mut collection, 2, false);
    assert!(is_unset_color(&collection.colors[0]));
    assert!(!is_unset_color(&collection.colors[first_blue]));
}
