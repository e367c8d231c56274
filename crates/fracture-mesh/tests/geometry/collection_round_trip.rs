use approx::assert_relative_eq;
use fracture_mesh::conversion::{CollectionImportFlags, DynamicMeshCollection, UpdateError};
use fracture_mesh::math::{
    Color, Isometry, Isometry3, Point3, Real, Translation3, UnitQuaternion, Vector2,
};
use fracture_mesh::shape::{DynamicMesh, GeometryCollection};

fn random_soup(rng: &mut oorandom::Rand32, num_triangles: usize) -> (Vec<Point3<f32>>, Vec<[u32; 3]>) {
    let mut vertices = vec![];
    let mut indices = vec![];
    for i in 0..num_triangles as u32 {
        for _ in 0..3 {
            vertices.push(Point3::new(rng.rand_float(), rng.rand_float(), rng.rand_float()));
        }
        indices.push([i * 3, i * 3 + 1, i * 3 + 2]);
    }
    (vertices, indices)
}

fn random_collection(seed: u64) -> GeometryCollection {
    let mut rng = oorandom::Rand32::new(seed);
    let mut collection = GeometryCollection::new();
    let color = Color::new(0.2, 0.4, 0.6, 1.0);

    let (vertices, indices) = random_soup(&mut rng, 5);
    let _ = collection
        .append_geometry(Isometry3::identity(), None, &vertices, &indices, color)
        .unwrap();

    for _ in 0..2 {
        let pose = Isometry3::from_parts(
            Translation3::new(rng.rand_float(), rng.rand_float(), rng.rand_float()),
            UnitQuaternion::from_euler_angles(rng.rand_float(), rng.rand_float(), rng.rand_float()),
        );
        let (vertices, indices) = random_soup(&mut rng, 7);
        let _ = collection
            .append_geometry(pose, Some(0), &vertices, &indices, color)
            .unwrap();
    }

    collection
}

fn import(collection: &GeometryCollection, collection_transform: &Isometry<Real>) -> DynamicMeshCollection {
    let all: Vec<_> = (0..collection.num_transforms()).collect();
    DynamicMeshCollection::init(
        collection,
        &collection.transforms,
        &all,
        collection_transform,
        CollectionImportFlags::empty(),
    )
    .unwrap()
}

#[test]
fn random_collections_survive_a_round_trip() {
    for seed in 0..10 {
        let mut collection = random_collection(seed);
        let original = collection.clone();
        let mut meshes = import(&collection, &Isometry::translation(10.0, 0.0, 0.0));
        assert_eq!(meshes.meshes.len(), 3);
        assert!(meshes.bounds.mins.x > 5.0);

        assert!(meshes.update_all_collections(&mut collection));
        assert_eq!(collection.validate(), Ok(()));
        assert_eq!(collection.num_vertices(), original.num_vertices());
        assert_eq!(collection.indices, original.indices);
        for (a, b) in collection.vertices.iter().zip(original.vertices.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1.0e-4);
        }
        for (a, b) in collection.normals.iter().zip(original.normals.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1.0e-4);
        }

        // The bone channel identifies the geometry of each vertex.
        assert_eq!(collection.num_uv_layers(), 1);
        for g in 0..collection.num_geometries() {
            let start = collection.vertex_start[g];
            for uv in &collection.uvs[0][start..start + collection.vertex_count[g]] {
                assert_eq!(*uv, Vector2::new(g as f32 / 3.0, 0.0));
            }
        }
    }
}

#[test]
fn appending_an_empty_mesh_is_a_no_op() {
    let mut collection = random_collection(7);
    let before = collection.clone();
    let mut empty = DynamicMesh::new();
    empty.augment(1);

    let appended = DynamicMeshCollection::append_to_collection(
        &Isometry::identity(),
        &mut empty,
        0.0,
        Some(0),
        "empty".to_string(),
        &mut collection,
        0,
    );
    assert_eq!(appended, Ok(None));
    assert_eq!(collection.num_transforms(), before.num_transforms());
    assert_eq!(collection.num_geometries(), before.num_geometries());
}

#[test]
fn appended_meshes_become_rigid_children() {
    let mut collection = random_collection(3);
    let mut meshes = import(&collection, &Isometry::identity());
    let data = &mut meshes.meshes[1];
    let from_collection = data.from_collection;

    let appended = DynamicMeshCollection::append_to_collection(
        &from_collection,
        data.mesh_mut(),
        0.0,
        Some(0),
        "copy".to_string(),
        &mut collection,
        0,
    )
    .unwrap();

    assert_eq!(appended, Some(3));
    assert_eq!(collection.validate(), Ok(()));
    assert_eq!(collection.parents[3], Some(0));
    assert_eq!(collection.bone_names[3], "copy");
    assert_eq!(collection.transform_index[3], 3);
    assert_eq!(collection.face_count[3], 7);
    assert_eq!(collection.bone_colors[3], collection.bone_colors[0]);
    assert!(collection.children[0].contains(&3));
}

#[test]
fn unaugmented_meshes_are_rejected() {
    let mut collection = random_collection(11);
    let mut mesh = DynamicMesh::from_vertices_and_indices(
        &[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        &[[0, 1, 2]],
    );

    let appended = DynamicMeshCollection::append_to_collection(
        &Isometry::identity(),
        &mut mesh,
        0.0,
        None,
        "bare".to_string(),
        &mut collection,
        0,
    );
    assert_eq!(appended, Err(UpdateError::NotAugmented));
    assert_eq!(collection.num_geometries(), 3);
}

#[test]
fn collision_samples_are_written_back_as_isolated_vertices() {
    let mut collection = GeometryCollection::new();
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(0.0, 6.0, 0.0),
            ],
            &[[0, 1, 2]],
            Color::new(1.0, 1.0, 1.0, 1.0),
        )
        .unwrap();
    let mut meshes = import(&collection, &Isometry::identity());

    let added = meshes.add_collision_samples(1.0).unwrap();
    assert!(added > 0);
    assert!(meshes.update_all_collections(&mut collection));
    assert_eq!(collection.validate(), Ok(()));
    assert_eq!(collection.vertex_count, vec![3 + added]);
    assert_eq!(collection.face_count, vec![1]);
    assert!(collection.bone_map.iter().all(|bone| *bone == 0));
}

#[test]
fn visibility_is_set_per_geometry() {
    let mut collection = random_collection(5);
    DynamicMeshCollection::set_geometry_visibility(&mut collection, &[1], false);

    for g in 0..collection.num_geometries() {
        let start = collection.face_start[g];
        let faces = &collection.visible[start..start + collection.face_count[g]];
        assert!(faces.iter().all(|visible| *visible == (g != 1)));
    }
}
