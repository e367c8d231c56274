use crate::shapes::{cube_vertices, to_f32, CUBE_INDICES};
use fracture_mesh::conversion::{
    compute_nesting, split_islands, CollectionImportFlags, DynamicMeshCollection, ReplacedGeometry,
};
use fracture_mesh::math::{Color, Isometry, Isometry3, Point3, Real};
use fracture_mesh::shape::{DynamicMesh, GeometryCollection, SimulationType};

fn cubes(specs: &[([Real; 3], Real)]) -> (Vec<Point3<Real>>, Vec<[u32; 3]>) {
    let mut vertices = vec![];
    let mut indices = vec![];
    for (center, half_extent) in specs {
        let base = vertices.len() as u32;
        vertices.extend(cube_vertices(*center, *half_extent));
        indices.extend(CUBE_INDICES.iter().map(|tri| tri.map(|i| i + base)));
    }
    (vertices, indices)
}

#[test]
fn cavities_stay_attached_to_their_shell() {
    let (vertices, indices) = cubes(&[
        ([0.0, 0.0, 0.0], 2.0),
        ([0.0, 0.0, 0.0], 0.5),
        ([10.0, 0.0, 0.0], 0.5),
    ]);
    let mesh = DynamicMesh::from_vertices_and_indices(&vertices, &indices);

    let islands = split_islands(&mesh).unwrap();
    assert_eq!(islands.len(), 2);
    assert_eq!(islands[0].triangle_count(), 24);
    assert_eq!(islands[1].triangle_count(), 12);
    assert!(islands[1].bounds().mins.x > 9.0);
}

#[test]
fn nesting_uses_the_largest_enclosing_mesh() {
    let meshes: Vec<_> = [([0.0, 0.0, 0.0], 0.25), ([0.0, 0.0, 0.0], 1.0), ([0.0, 0.0, 0.0], 3.0)]
        .iter()
        .map(|cube| {
            let (vertices, indices) = cubes(&[*cube]);
            DynamicMesh::from_vertices_and_indices(&vertices, &indices)
        })
        .collect();

    let nests = compute_nesting(&meshes);
    assert_eq!(nests.len(), 1);
    assert_eq!(nests[0].outer, 2);
    assert_eq!(nests[0].inners, vec![0, 1]);
}

#[test]
fn a_shell_and_its_cavity_are_a_single_island() {
    let (vertices, indices) = cubes(&[([0.0, 0.0, 0.0], 2.0), ([0.0, 0.0, 0.0], 0.5)]);
    let mesh = DynamicMesh::from_vertices_and_indices(&vertices, &indices);
    assert!(split_islands(&mesh).is_none());

    let mut collection = GeometryCollection::new();
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &to_f32(&vertices),
            &indices,
            Color::new(1.0, 1.0, 1.0, 1.0),
        )
        .unwrap();
    let before = collection.clone();

    for replaced_geometry in [ReplacedGeometry::Hide, ReplacedGeometry::Remove] {
        let meshes = import(&collection, replaced_geometry);
        assert_eq!(meshes.split_all_islands(&mut collection, 0.0), Ok(None));
        assert_eq!(collection, before);
    }
}

fn two_cube_collection() -> GeometryCollection {
    let (vertices, indices) = cubes(&[([0.0, 0.0, 0.0], 0.5), ([3.0, 0.0, 0.0], 0.5)]);
    let mut collection = GeometryCollection::new();
    let _ = collection
        .append_geometry(
            Isometry3::translation(0.0, 1.0, 0.0),
            None,
            &to_f32(&vertices),
            &indices,
            Color::new(1.0, 1.0, 1.0, 1.0),
        )
        .unwrap();
    collection.bone_names[0] = "rock".to_string();
    collection
}

fn import(collection: &GeometryCollection, replaced_geometry: ReplacedGeometry) -> DynamicMeshCollection {
    let mut meshes = DynamicMeshCollection::init(
        collection,
        &collection.transforms,
        &[0],
        &Isometry::identity(),
        CollectionImportFlags::empty(),
    )
    .unwrap();
    meshes.replaced_geometry = replaced_geometry;
    meshes
}

#[test]
fn split_geometries_are_hidden() {
    let mut collection = two_cube_collection();
    let meshes = import(&collection, ReplacedGeometry::Hide);

    let first = meshes.split_all_islands(&mut collection, 0.0).unwrap();
    assert_eq!(first, Some(1));
    assert_eq!(collection.validate(), Ok(()));
    assert_eq!(collection.num_geometries(), 3);
    assert!(collection.visible[..12 * 2].iter().all(|visible| !*visible));
    assert!(collection.visible[12 * 2..].iter().all(|visible| *visible));

    assert_eq!(collection.bone_names[1], "rock_0");
    assert_eq!(collection.bone_names[2], "rock_1");
    assert_eq!(collection.parents[1], Some(0));
    assert_eq!(collection.simulation_types[0], SimulationType::Clustered);
    assert_eq!(collection.simulation_types[2], SimulationType::Rigid);

    // The islands are written relative to their own identity bone, under the
    // transform of the split bone.
    let vid = collection.vertex_start[2];
    let global = collection.global_transform(2) * collection.vertices[vid];
    assert!(global.x > 2.0);
    assert!(global.y > 0.0);
}

#[test]
fn split_geometries_are_removed() {
    let mut collection = two_cube_collection();
    let meshes = import(&collection, ReplacedGeometry::Remove);

    let first = meshes.split_all_islands(&mut collection, 0.0).unwrap();
    assert_eq!(first, Some(0));
    assert_eq!(collection.validate(), Ok(()));
    assert_eq!(collection.num_geometries(), 2);
    assert_eq!(collection.face_count, vec![12, 12]);
    assert_eq!(collection.vertex_count, vec![8, 8]);
    assert_eq!(collection.transform_to_geometry_index, vec![None, Some(0), Some(1)]);
}

#[test]
fn single_islands_are_left_alone() {
    let (vertices, indices) = cubes(&[([0.0, 0.0, 0.0], 0.5)]);
    let mut collection = GeometryCollection::new();
    let _ = collection
        .append_geometry(
            Isometry3::identity(),
            None,
            &to_f32(&vertices),
            &indices,
            Color::new(1.0, 1.0, 1.0, 1.0),
        )
        .unwrap();
    let before = collection.clone();
    let meshes = import(&collection, ReplacedGeometry::Remove);

    assert_eq!(meshes.split_all_islands(&mut collection, 0.0), Ok(None));
    assert_eq!(collection, before);
}
