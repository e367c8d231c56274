//! The fixed attribute schema carried by the meshes extracted from geometry collections.
//!
//! An *augmented* mesh carries, on top of its positions:
//! - per vertex: a normal, a color, a tangent frame and up to [`MAX_NUM_UV_CHANNELS`] UVs,
//! - per triangle: a material identifier, a visibility flag and an internal flag.
//!
//! All the accessors are checked and return an [`AttributeError`] instead of
//! reading or writing attributes that are not there.

use crate::math::{Color, Vector2, Vector3};
use crate::shape::DynamicMesh;
use crate::utils::orthonormal_basis;
use smallvec::SmallVec;

/// A color far outside of the valid range, marking vertices whose color must be computed.
///
/// It is not `-f32::MAX` so that sums of a few unset colors do not overflow.
pub const UNSET_VERTEX_COLOR: Color = Color::new(
    -f32::MAX * 0.25,
    -f32::MAX * 0.25,
    -f32::MAX * 0.25,
    -f32::MAX * 0.25,
);

/// The color given to vertices whose color could not be computed: opaque black.
pub const DEFAULT_VERTEX_COLOR: Color = Color::new(0.0, 0.0, 0.0, 1.0);

/// The maximum number of UV channels of an augmented mesh.
pub const MAX_NUM_UV_CHANNELS: usize = 8;

/// Is any component of `color` negative, i.e., is it a placeholder for a color still to be computed?
#[inline]
pub fn is_unset_color(color: &Color) -> bool {
    color.iter().any(|c| *c < 0.0)
}

/// Error raised when accessing the attributes of a mesh.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttributeError {
    /// The mesh does not carry the full augmented attribute set.
    #[error("the mesh does not carry the augmented attribute set.")]
    NotAugmented,
    /// The requested UV channel is not enabled.
    #[error("the UV channel {channel} is not enabled (the mesh has {num_channels} UV channels).")]
    UvChannelOutOfRange {
        /// The requested channel.
        channel: usize,
        /// The number of enabled channels.
        num_channels: usize,
    },
    /// The vertex does not exist.
    #[error("the vertex {0} does not exist.")]
    InvalidVertex(u32),
    /// The triangle does not exist.
    #[error("the triangle {0} does not exist.")]
    InvalidTriangle(u32),
}

/// The role of a triangle, derived from its material identifier.
///
/// Geometry collections interleave materials: even identifiers are the
/// authored outside surfaces, odd identifiers the surfaces created by fracturing.
/// Negative identifiers mark triangles synthesized by a processing step that
/// have not been given a material yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaterialRole {
    /// A synthesized triangle waiting for the fallback internal material.
    Unassigned,
    /// An authored outside surface.
    Exterior(i32),
    /// A surface created by fracturing.
    Interior(i32),
}

impl MaterialRole {
    /// Classifies a raw material identifier.
    pub fn from_raw(material_id: i32) -> Self {
        if material_id < 0 {
            MaterialRole::Unassigned
        } else if material_id % 2 == 0 {
            MaterialRole::Exterior(material_id)
        } else {
            MaterialRole::Interior(material_id)
        }
    }

    /// The raw material identifier, `-1` for unassigned materials.
    pub fn raw(self) -> i32 {
        match self {
            MaterialRole::Unassigned => -1,
            MaterialRole::Exterior(id) | MaterialRole::Interior(id) => id,
        }
    }

    /// Is this an authored outside surface?
    pub fn is_exterior(self) -> bool {
        matches!(self, MaterialRole::Exterior(_))
    }
}

/// A snapshot of all the attributes of one vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexAttributes {
    /// The vertex normal.
    pub normal: Vector3<f32>,
    /// The vertex color, possibly [`UNSET_VERTEX_COLOR`].
    pub color: Color,
    /// The first tangent.
    pub tangent_u: Vector3<f32>,
    /// The second tangent.
    pub tangent_v: Vector3<f32>,
    /// One UV per enabled channel.
    pub uvs: SmallVec<[Vector2<f32>; 4]>,
}

impl Default for VertexAttributes {
    fn default() -> Self {
        Self {
            normal: Vector3::z(),
            color: UNSET_VERTEX_COLOR,
            tangent_u: Vector3::x(),
            tangent_v: Vector3::y(),
            uvs: SmallVec::new(),
        }
    }
}

/// All the attributes of one triangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TriangleAttributes {
    /// The raw material identifier, see [`MaterialRole`].
    pub material_id: i32,
    /// Is the triangle rendered?
    pub visible: bool,
    /// Was the triangle created by fracturing or repair rather than authored?
    pub internal: bool,
}

impl Default for TriangleAttributes {
    fn default() -> Self {
        Self {
            material_id: 0,
            visible: true,
            internal: false,
        }
    }
}

/// Attribute storage parallel to the vertex and triangle arenas of a [`DynamicMesh`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct AugmentedAttributes {
    colors: Vec<Color>,
    tangents_u: Vec<Vector3<f32>>,
    tangents_v: Vec<Vector3<f32>>,
    uvs: Vec<Vec<Vector2<f32>>>,
    material_ids: Vec<i32>,
    visible: Vec<bool>,
    internal: Vec<bool>,
}

impl AugmentedAttributes {
    fn new(num_vertices: usize, num_triangles: usize) -> Self {
        Self {
            colors: vec![UNSET_VERTEX_COLOR; num_vertices],
            tangents_u: vec![Vector3::x(); num_vertices],
            tangents_v: vec![Vector3::y(); num_vertices],
            uvs: vec![],
            material_ids: vec![0; num_triangles],
            // Triangles that existed before augmentation are flagged as visible cut surfaces.
            visible: vec![true; num_triangles],
            internal: vec![true; num_triangles],
        }
    }

    pub(crate) fn empty_like(&self) -> Self {
        Self {
            uvs: vec![vec![]; self.uvs.len()],
            ..Self::default()
        }
    }

    pub(crate) fn push_default_vertex(&mut self) {
        self.colors.push(UNSET_VERTEX_COLOR);
        self.tangents_u.push(Vector3::x());
        self.tangents_v.push(Vector3::y());
        for channel in &mut self.uvs {
            channel.push(Vector2::zeros());
        }
    }

    pub(crate) fn push_vertex_copy(&mut self, vid: usize) {
        self.colors.push(self.colors[vid]);
        self.tangents_u.push(self.tangents_u[vid]);
        self.tangents_v.push(self.tangents_v[vid]);
        for channel in &mut self.uvs {
            channel.push(channel[vid]);
        }
    }

    pub(crate) fn push_default_triangle(&mut self) {
        let defaults = TriangleAttributes::default();
        self.material_ids.push(defaults.material_id);
        self.visible.push(defaults.visible);
        self.internal.push(defaults.internal);
    }

    /// Copies the attributes of the vertex `src_vid` of `src` to the existing vertex `dst_vid`.
    ///
    /// UV channels missing from `src` are left untouched.
    pub(crate) fn copy_vertex_from(&mut self, dst_vid: usize, src: &Self, src_vid: usize) {
        self.colors[dst_vid] = src.colors[src_vid];
        self.tangents_u[dst_vid] = src.tangents_u[src_vid];
        self.tangents_v[dst_vid] = src.tangents_v[src_vid];
        for (dst, src) in self.uvs.iter_mut().zip(src.uvs.iter()) {
            dst[dst_vid] = src[src_vid];
        }
    }

    pub(crate) fn copy_triangle_from(&mut self, dst_tid: usize, src: &Self, src_tid: usize) {
        self.material_ids[dst_tid] = src.material_ids[src_tid];
        self.visible[dst_tid] = src.visible[src_tid];
        self.internal[dst_tid] = src.internal[src_tid];
    }

    pub(crate) fn retain_alive(&mut self, vertex_alive: &[bool], triangle_alive: &[bool]) {
        fn retain<T>(data: &mut Vec<T>, alive: &[bool]) {
            let mut i = 0;
            data.retain(|_| {
                i += 1;
                alive[i - 1]
            });
        }

        retain(&mut self.colors, vertex_alive);
        retain(&mut self.tangents_u, vertex_alive);
        retain(&mut self.tangents_v, vertex_alive);
        for channel in &mut self.uvs {
            retain(channel, vertex_alive);
        }
        retain(&mut self.material_ids, triangle_alive);
        retain(&mut self.visible, triangle_alive);
        retain(&mut self.internal, triangle_alive);
    }
}

impl DynamicMesh {
    /*
     * Attribute attachment.
     */
    /// Does this mesh carry per-vertex normals?
    pub fn has_vertex_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Attaches per-vertex normals initialized to `+Z`, unless they already exist.
    pub fn enable_vertex_normals(&mut self) {
        if self.normals.is_none() {
            self.normals = Some(vec![Vector3::z(); self.max_vertex_id() as usize]);
        }
    }

    /// Removes the per-vertex normals.
    pub fn discard_vertex_normals(&mut self) {
        self.normals = None;
    }

    /// Attaches vertex normals and the augmented attribute set, with `num_uv_channels` UV channels.
    ///
    /// Attributes that already exist are left untouched, so calling this twice is
    /// a no-op. UV channels beyond `num_uv_channels` are removed.
    pub fn augment(&mut self, num_uv_channels: usize) {
        self.enable_vertex_normals();
        if self.attributes.is_none() {
            self.attributes = Some(AugmentedAttributes::new(
                self.max_vertex_id() as usize,
                self.max_triangle_id() as usize,
            ));
        }
        let _ = self.enable_uv_channels(num_uv_channels, false);
    }

    /// Does this mesh carry vertex normals and the whole augmented attribute set?
    pub fn is_augmented(&self) -> bool {
        self.normals.is_some() && self.attributes.is_some()
    }

    /// Removes the augmented attribute set (but not the vertex normals).
    pub fn discard_attributes(&mut self) {
        self.attributes = None;
    }

    /// Sets the number of UV channels.
    ///
    /// Missing channels are added and initialized to zero; existing channels are
    /// reset to zero if `reset_existing` is `true`; channels beyond `num_uv_channels`
    /// are removed. The count is clamped to [`MAX_NUM_UV_CHANNELS`].
    pub fn enable_uv_channels(
        &mut self,
        num_uv_channels: usize,
        reset_existing: bool,
    ) -> Result<(), AttributeError> {
        let num_vertices = self.max_vertex_id() as usize;
        let attributes = self
            .attributes
            .as_mut()
            .ok_or(AttributeError::NotAugmented)?;

        let num_uv_channels = if num_uv_channels > MAX_NUM_UV_CHANNELS {
            log::warn!(
                "Requested {} UV channels, clamping to {}.",
                num_uv_channels,
                MAX_NUM_UV_CHANNELS
            );
            MAX_NUM_UV_CHANNELS
        } else {
            num_uv_channels
        };

        if reset_existing {
            for channel in &mut attributes.uvs {
                channel.fill(Vector2::zeros());
            }
        }
        attributes
            .uvs
            .resize_with(num_uv_channels, || vec![Vector2::zeros(); num_vertices]);

        Ok(())
    }

    /// The number of enabled UV channels (zero if the mesh is not augmented).
    pub fn num_uv_channels(&self) -> usize {
        self.attributes
            .as_ref()
            .map(|attrs| attrs.uvs.len())
            .unwrap_or(0)
    }

    /// Gives every vertex a tangent frame perpendicular to its normal and the unset
    /// color, and sets the visibility of every triangle.
    pub fn set_default_attributes(&mut self, visible: bool) -> Result<(), AttributeError> {
        let (normals, attributes) = match (&self.normals, &mut self.attributes) {
            (Some(normals), Some(attributes)) => (normals, attributes),
            _ => return Err(AttributeError::NotAugmented),
        };

        for vid in 0..normals.len() {
            let [u, v] = orthonormal_basis(&normals[vid]);
            attributes.tangents_u[vid] = u;
            attributes.tangents_v[vid] = v;
            attributes.colors[vid] = UNSET_VERTEX_COLOR;
        }
        attributes.visible.fill(visible);

        Ok(())
    }

    /*
     * Checked access helpers.
     */
    fn check_vertex(&self, vid: u32) -> Result<&AugmentedAttributes, AttributeError> {
        if !self.is_augmented() {
            return Err(AttributeError::NotAugmented);
        }
        if !self.is_vertex(vid) {
            return Err(AttributeError::InvalidVertex(vid));
        }
        self.attributes.as_ref().ok_or(AttributeError::NotAugmented)
    }

    fn check_vertex_mut(&mut self, vid: u32) -> Result<&mut AugmentedAttributes, AttributeError> {
        let _ = self.check_vertex(vid)?;
        self.attributes.as_mut().ok_or(AttributeError::NotAugmented)
    }

    fn check_triangle(&self, tid: u32) -> Result<&AugmentedAttributes, AttributeError> {
        if !self.is_augmented() {
            return Err(AttributeError::NotAugmented);
        }
        if !self.is_triangle(tid) {
            return Err(AttributeError::InvalidTriangle(tid));
        }
        self.attributes.as_ref().ok_or(AttributeError::NotAugmented)
    }

    fn check_triangle_mut(
        &mut self,
        tid: u32,
    ) -> Result<&mut AugmentedAttributes, AttributeError> {
        let _ = self.check_triangle(tid)?;
        self.attributes.as_mut().ok_or(AttributeError::NotAugmented)
    }

    fn check_uv_channel(attributes: &AugmentedAttributes, channel: usize) -> Result<(), AttributeError> {
        if channel >= attributes.uvs.len() {
            Err(AttributeError::UvChannelOutOfRange {
                channel,
                num_channels: attributes.uvs.len(),
            })
        } else {
            Ok(())
        }
    }

    /*
     * Per-vertex attributes.
     */
    /// The normal of the vertex `vid`.
    pub fn vertex_normal(&self, vid: u32) -> Result<Vector3<f32>, AttributeError> {
        if !self.is_vertex(vid) {
            return Err(AttributeError::InvalidVertex(vid));
        }
        self.normals
            .as_ref()
            .map(|normals| normals[vid as usize])
            .ok_or(AttributeError::NotAugmented)
    }

    /// Sets the normal of the vertex `vid`.
    pub fn set_vertex_normal(&mut self, vid: u32, normal: Vector3<f32>) -> Result<(), AttributeError> {
        if !self.is_vertex(vid) {
            return Err(AttributeError::InvalidVertex(vid));
        }
        let normals = self.normals.as_mut().ok_or(AttributeError::NotAugmented)?;
        normals[vid as usize] = normal;
        Ok(())
    }

    /// The color of the vertex `vid`.
    pub fn vertex_color(&self, vid: u32) -> Result<Color, AttributeError> {
        Ok(self.check_vertex(vid)?.colors[vid as usize])
    }

    /// Sets the color of the vertex `vid`.
    pub fn set_vertex_color(&mut self, vid: u32, color: Color) -> Result<(), AttributeError> {
        self.check_vertex_mut(vid)?.colors[vid as usize] = color;
        Ok(())
    }

    /// The tangents `(u, v)` of the vertex `vid`.
    pub fn vertex_tangents(&self, vid: u32) -> Result<(Vector3<f32>, Vector3<f32>), AttributeError> {
        let attributes = self.check_vertex(vid)?;
        Ok((
            attributes.tangents_u[vid as usize],
            attributes.tangents_v[vid as usize],
        ))
    }

    /// Sets the normal and the tangents of the vertex `vid`.
    pub fn set_vertex_tangents(
        &mut self,
        vid: u32,
        normal: Vector3<f32>,
        tangent_u: Vector3<f32>,
        tangent_v: Vector3<f32>,
    ) -> Result<(), AttributeError> {
        let attributes = self.check_vertex_mut(vid)?;
        attributes.tangents_u[vid as usize] = tangent_u;
        attributes.tangents_v[vid as usize] = tangent_v;
        self.set_vertex_normal(vid, normal)
    }

    /// The UV of the vertex `vid` on the channel `channel`.
    pub fn vertex_uv(&self, vid: u32, channel: usize) -> Result<Vector2<f32>, AttributeError> {
        let attributes = self.check_vertex(vid)?;
        Self::check_uv_channel(attributes, channel)?;
        Ok(attributes.uvs[channel][vid as usize])
    }

    /// Sets the UV of the vertex `vid` on the channel `channel`.
    pub fn set_vertex_uv(
        &mut self,
        vid: u32,
        channel: usize,
        uv: Vector2<f32>,
    ) -> Result<(), AttributeError> {
        let attributes = self.check_vertex_mut(vid)?;
        Self::check_uv_channel(attributes, channel)?;
        attributes.uvs[channel][vid as usize] = uv;
        Ok(())
    }

    /// Sets the UV of the vertex `vid` on every enabled channel.
    pub fn set_all_vertex_uvs(&mut self, vid: u32, uv: Vector2<f32>) -> Result<(), AttributeError> {
        for channel in &mut self.check_vertex_mut(vid)?.uvs {
            channel[vid as usize] = uv;
        }
        Ok(())
    }

    /// All the attributes of the vertex `vid`.
    pub fn vertex_attributes(&self, vid: u32) -> Result<VertexAttributes, AttributeError> {
        let attributes = self.check_vertex(vid)?;
        let vid = vid as usize;
        Ok(VertexAttributes {
            normal: self.vertex_normal(vid as u32)?,
            color: attributes.colors[vid],
            tangent_u: attributes.tangents_u[vid],
            tangent_v: attributes.tangents_v[vid],
            uvs: attributes.uvs.iter().map(|channel| channel[vid]).collect(),
        })
    }

    /// Sets all the attributes of the vertex `vid`.
    ///
    /// Only the first `min(attrs.uvs.len(), self.num_uv_channels())` UV channels are written.
    pub fn set_vertex_attributes(
        &mut self,
        vid: u32,
        attrs: &VertexAttributes,
    ) -> Result<(), AttributeError> {
        let attributes = self.check_vertex_mut(vid)?;
        let i = vid as usize;
        attributes.colors[i] = attrs.color;
        attributes.tangents_u[i] = attrs.tangent_u;
        attributes.tangents_v[i] = attrs.tangent_v;
        for (channel, uv) in attributes.uvs.iter_mut().zip(attrs.uvs.iter()) {
            channel[i] = *uv;
        }
        self.set_vertex_normal(vid, attrs.normal)
    }

    /*
     * Per-triangle attributes.
     */
    /// The raw material identifier of the triangle `tid`.
    pub fn material_id(&self, tid: u32) -> Result<i32, AttributeError> {
        Ok(self.check_triangle(tid)?.material_ids[tid as usize])
    }

    /// The role of the material of the triangle `tid`.
    pub fn material_role(&self, tid: u32) -> Result<MaterialRole, AttributeError> {
        self.material_id(tid).map(MaterialRole::from_raw)
    }

    /// Sets the raw material identifier of the triangle `tid`.
    pub fn set_material_id(&mut self, tid: u32, material_id: i32) -> Result<(), AttributeError> {
        self.check_triangle_mut(tid)?.material_ids[tid as usize] = material_id;
        Ok(())
    }

    /// Is the triangle `tid` visible?
    pub fn is_visible(&self, tid: u32) -> Result<bool, AttributeError> {
        Ok(self.check_triangle(tid)?.visible[tid as usize])
    }

    /// Sets the visibility of the triangle `tid`.
    pub fn set_visible(&mut self, tid: u32, visible: bool) -> Result<(), AttributeError> {
        self.check_triangle_mut(tid)?.visible[tid as usize] = visible;
        Ok(())
    }

    /// Is the triangle `tid` an internal surface?
    pub fn is_internal(&self, tid: u32) -> Result<bool, AttributeError> {
        Ok(self.check_triangle(tid)?.internal[tid as usize])
    }

    /// Flags the triangle `tid` as an internal surface or not.
    pub fn set_internal(&mut self, tid: u32, internal: bool) -> Result<(), AttributeError> {
        self.check_triangle_mut(tid)?.internal[tid as usize] = internal;
        Ok(())
    }

    /// All the attributes of the triangle `tid`.
    pub fn triangle_attributes(&self, tid: u32) -> Result<TriangleAttributes, AttributeError> {
        let attributes = self.check_triangle(tid)?;
        let i = tid as usize;
        Ok(TriangleAttributes {
            material_id: attributes.material_ids[i],
            visible: attributes.visible[i],
            internal: attributes.internal[i],
        })
    }

    /// Sets all the attributes of the triangle `tid`.
    pub fn set_triangle_attributes(
        &mut self,
        tid: u32,
        attrs: TriangleAttributes,
    ) -> Result<(), AttributeError> {
        let attributes = self.check_triangle_mut(tid)?;
        let i = tid as usize;
        attributes.material_ids[i] = attrs.material_id;
        attributes.visible[i] = attrs.visible;
        attributes.internal[i] = attrs.internal;
        Ok(())
    }
}
