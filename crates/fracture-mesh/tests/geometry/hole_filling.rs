use crate::shapes::{cube_vertices, to_f32, CUBE_INDICES};
use fracture_mesh::conversion::{
    fill_holes, CollectionImportFlags, DynamicMeshCollection, FillHolesOptions,
};
use fracture_mesh::math::{Color, Isometry, Isometry3, Vector3};
use fracture_mesh::shape::GeometryCollection;

#[test]
fn open_box_is_closed_and_written_back() {
    let mut collection = GeometryCollection::new();
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &to_f32(&cube_vertices([0.0, 0.0, 0.0], 1.0)),
            &CUBE_INDICES,
            Color::new(0.5, 0.5, 0.5, 1.0),
        )
        .unwrap();
    collection.material_ids.fill(1);
    collection.internal.fill(true);

    let mut meshes = DynamicMeshCollection::init(
        &collection,
        &collection.transforms,
        &[0],
        &Isometry::identity(),
        CollectionImportFlags::empty(),
    )
    .unwrap();

    {
        let mesh = meshes.meshes[0].mesh_mut();
        // Open the +Z side.
        assert!(mesh.remove_triangle(2, false));
        assert!(mesh.remove_triangle(3, false));
        assert_eq!(mesh.boundary_edges().count(), 4);

        let edges: Vec<_> = mesh.edge_ids().collect();
        let report = fill_holes(mesh, &edges, &FillHolesOptions::default()).unwrap();
        assert_eq!(report.holes_found, 1);
        assert_eq!(report.holes_filled, 1);
        assert_eq!(report.triangles_added, 2);
        assert_eq!(mesh.boundary_edges().count(), 0);
        assert_eq!(mesh.vertex_count(), 8);

        for tid in mesh.triangle_ids().filter(|tid| *tid >= 12) {
            assert_eq!(mesh.material_id(tid), Ok(1));
            assert!(mesh.triangle_normal(tid).dot(&Vector3::z()) > 0.99);
        }
    }

    assert!(meshes.update_all_collections(&mut collection));
    assert_eq!(collection.validate(), Ok(()));
    assert_eq!(collection.face_count, vec![12]);
    assert_eq!(collection.vertex_count, vec![8]);
    assert!(collection.material_ids.iter().all(|id| *id == 1));
    assert!(collection.internal.iter().all(|internal| *internal));
}

#[test]
fn holes_outside_of_the_candidates_are_ignored() {
    let mut collection = GeometryCollection::new();
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &to_f32(&cube_vertices([0.0, 0.0, 0.0], 1.0)),
            &CUBE_INDICES[2..],
            Color::new(0.5, 0.5, 0.5, 1.0),
        )
        .unwrap();
    collection.material_ids.fill(1);

    let mut meshes = DynamicMeshCollection::init(
        &collection,
        &collection.transforms,
        &[0],
        &Isometry::identity(),
        CollectionImportFlags::empty(),
    )
    .unwrap();

    let mesh = meshes.meshes[0].mesh_mut();
    let report = fill_holes(mesh, &[], &FillHolesOptions::default()).unwrap();
    assert_eq!(report.holes_found, 0);
    assert_eq!(mesh.triangle_count(), 10);
}
