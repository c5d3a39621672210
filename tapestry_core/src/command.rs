// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The inbound command set.
//!
//! Each session submits an ordered stream of [`Command`]s naming resources by
//! their client-chosen [`ResourceId`]. Id `0` is never a valid resource; in
//! commands that set an optional reference (a renderer's camera, a
//! material's texture) it means "none".
//!
//! A handful of variants survive only so that older clients still decode;
//! the applier always rejects them (see [`Command::is_legacy`]).

use alloc::string::String;
use alloc::vec::Vec;

use crate::geometry::{Plane3, Quaternion, Vec3};
use crate::koid::{ExportToken, ImportToken, ViewRef};
use crate::node::HitTestBehavior;
use crate::resource::{ColorConversion, ResourceId, Rgba8, ShadowTechnique, VariableValue};
use crate::view::ViewProperties;

/// A property value given either directly or through a Variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value<T> {
    /// A literal value.
    Literal(T),
    /// The id of a Variable the property follows.
    Variable(ResourceId),
}

/// Arguments for [`Command::CreateResource`].
#[derive(Debug)]
pub enum ResourceArgs {
    /// Client memory.
    Memory {
        /// Size in bytes.
        size: u64,
        /// Whether the memory is protected from CPU access.
        is_protected: bool,
    },
    /// An image backed by client memory.
    Image {
        /// The backing Memory.
        memory_id: ResourceId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// An axis-aligned rectangle centered at the origin.
    Rectangle {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// A rectangle with per-corner radii.
    RoundedRectangle {
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// Top-left corner radius.
        top_left_radius: f64,
        /// Top-right corner radius.
        top_right_radius: f64,
        /// Bottom-right corner radius.
        bottom_right_radius: f64,
        /// Bottom-left corner radius.
        bottom_left_radius: f64,
    },
    /// A circle centered at the origin.
    Circle {
        /// Radius.
        radius: f64,
    },
    /// A white, untextured material.
    Material,
    /// An `EntityNode`.
    EntityNode,
    /// A `ShapeNode`.
    ShapeNode,
    /// An `OpacityNode`, initially opaque.
    OpacityNode,
    /// A Scene.
    Scene {
        /// Identity of the Scene in the view tree.
        view_ref: ViewRef,
    },
    /// A View and its anchor node.
    View {
        /// The import half of the link to the embedding `ViewHolder`.
        token: ImportToken,
        /// Identity of the View in the view tree.
        view_ref: ViewRef,
        /// Name for diagnostics.
        debug_name: Option<String>,
    },
    /// A `ViewHolder`.
    ViewHolder {
        /// The export half of the link to the embedded View.
        token: ExportToken,
        /// Name for diagnostics.
        debug_name: Option<String>,
    },
    /// A camera looking at a Scene.
    Camera {
        /// The Scene.
        scene_id: ResourceId,
    },
    /// A renderer with no camera.
    Renderer,
    /// An ambient light.
    AmbientLight,
    /// A directional light pointing down the negative z axis.
    DirectionalLight,
    /// A point light at the origin.
    PointLight,
    /// A compositor layer with no size.
    Layer,
    /// An empty layer stack.
    LayerStack,
    /// An off-screen compositor.
    Compositor,
    /// A compositor that drives a display.
    DisplayCompositor,
    /// A variable with an initial value that fixes its type.
    Variable {
        /// Initial value.
        initial: VariableValue,
    },
}

/// A renderer setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererParam {
    /// The shadow technique.
    ShadowTechnique(ShadowTechnique),
    /// Renderer debug output. No longer honored.
    EnableDebugging(bool),
}

/// One mutation submitted by a session.
#[derive(Debug)]
pub enum Command {
    // -- Creation and lifetime --
    /// Creates a resource under a client-chosen id.
    CreateResource {
        /// The new id.
        id: ResourceId,
        /// What to create.
        resource: ResourceArgs,
    },
    /// Drops the session's reference to a resource.
    ReleaseResource {
        /// The id to release.
        id: ResourceId,
    },
    /// Legacy cross-session export.
    ExportResource {
        /// The resource to export.
        id: ResourceId,
    },
    /// Legacy cross-session import.
    ImportResource {
        /// The id the import would occupy.
        id: ResourceId,
    },

    // -- Node tree --
    /// Appends a child to a container node. A View id stands for the View's
    /// anchor.
    AddChild {
        /// The parent.
        node_id: ResourceId,
        /// The new child.
        child_id: ResourceId,
    },
    /// Legacy part attachment.
    AddPart {
        /// The parent.
        node_id: ResourceId,
        /// The part.
        part_id: ResourceId,
    },
    /// Detaches a node from its parent, or a light from its scene.
    Detach {
        /// The node or light.
        id: ResourceId,
    },
    /// Detaches every child of a container node or of a View's anchor.
    DetachChildren {
        /// The container.
        node_id: ResourceId,
    },

    // -- Node properties --
    /// Sets the value reported by hit tests.
    SetTag {
        /// The node.
        node_id: ResourceId,
        /// The tag.
        tag_value: u32,
    },
    /// Sets a node's translation.
    SetTranslation {
        /// The node.
        id: ResourceId,
        /// The translation.
        value: Value<Vec3>,
    },
    /// Sets a node's scale.
    SetScale {
        /// The node.
        id: ResourceId,
        /// The scale.
        value: Value<Vec3>,
    },
    /// Sets a node's rotation.
    SetRotation {
        /// The node.
        id: ResourceId,
        /// The rotation.
        value: Value<Quaternion>,
    },
    /// Sets the point a node rotates and scales about.
    SetAnchor {
        /// The node.
        id: ResourceId,
        /// The anchor.
        value: Value<Vec3>,
    },
    /// Sets the size of a layer.
    SetSize {
        /// The layer.
        id: ResourceId,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Sets the opacity of an `OpacityNode`.
    SetOpacity {
        /// The node.
        node_id: ResourceId,
        /// Opacity in `[0, 1]`.
        opacity: f32,
    },
    /// Legacy size hint.
    SendSizeChangeHint {
        /// The node.
        node_id: ResourceId,
    },
    /// Sets the shape drawn by a `ShapeNode`.
    SetShape {
        /// The `ShapeNode`.
        node_id: ResourceId,
        /// The shape.
        shape_id: ResourceId,
    },
    /// Sets the material of a `ShapeNode`.
    SetMaterial {
        /// The `ShapeNode`.
        node_id: ResourceId,
        /// The material.
        material_id: ResourceId,
    },
    /// Legacy clipping by node. Only disabling (`clip_id == 0`) is honored.
    SetClip {
        /// The node.
        node_id: ResourceId,
        /// The clip node, or 0.
        clip_id: ResourceId,
        /// Whether the node clips its own content.
        clip_to_self: bool,
    },
    /// Replaces a node's clip planes. An empty list disables plane clipping.
    SetClipPlanes {
        /// The node.
        node_id: ResourceId,
        /// Planes in the node's local space.
        clip_planes: Vec<Plane3>,
    },
    /// Sets how hit tests treat a node's subtree.
    SetHitTestBehavior {
        /// The node.
        node_id: ResourceId,
        /// The behavior.
        behavior: HitTestBehavior,
    },
    /// Sets whether a node is semantically visible.
    SetSemanticVisibility {
        /// The node.
        node_id: ResourceId,
        /// Visibility.
        visible: bool,
    },
    /// Sets a `ViewHolder`'s layout properties.
    SetViewProperties {
        /// The `ViewHolder`.
        view_holder_id: ResourceId,
        /// The properties.
        properties: ViewProperties,
    },
    /// Legacy snapshot request.
    TakeSnapshot {
        /// The node.
        node_id: ResourceId,
    },

    // -- Cameras --
    /// Sets or clears a renderer's camera.
    SetCamera {
        /// The renderer.
        renderer_id: ResourceId,
        /// The camera, or 0.
        camera_id: ResourceId,
    },
    /// Places a camera.
    SetCameraTransform {
        /// The camera.
        camera_id: ResourceId,
        /// Eye position.
        eye_position: Vec3,
        /// Point looked at.
        eye_look_at: Vec3,
        /// Up direction.
        eye_up: Vec3,
    },
    /// Sets a camera's vertical field of view. Zero selects an orthographic
    /// projection.
    SetCameraProjection {
        /// The camera.
        camera_id: ResourceId,
        /// Field of view in radians.
        fovy: f64,
    },
    /// Stereo projection. Not supported.
    SetStereoCameraProjection {
        /// The camera.
        camera_id: ResourceId,
    },
    /// Pose-buffer driven cameras. Not supported.
    SetCameraPoseBuffer {
        /// The camera.
        camera_id: ResourceId,
    },

    // -- Lights --
    /// Sets a light's color.
    SetLightColor {
        /// The light.
        light_id: ResourceId,
        /// Linear RGB, each channel non-negative.
        color: [f32; 3],
    },
    /// Sets a directional light's direction.
    SetLightDirection {
        /// The light.
        light_id: ResourceId,
        /// Direction.
        direction: Vec3,
    },
    /// Sets a point light's position.
    SetPointLightPosition {
        /// The light.
        light_id: ResourceId,
        /// Position.
        position: Vec3,
    },
    /// Sets a point light's falloff.
    SetPointLightFalloff {
        /// The light.
        light_id: ResourceId,
        /// Falloff, non-negative.
        falloff: f32,
    },
    /// Legacy untyped light attachment.
    AddLight {
        /// The scene.
        scene_id: ResourceId,
        /// The light.
        light_id: ResourceId,
    },
    /// Adds an ambient light to a scene.
    SceneAddAmbientLight {
        /// The scene.
        scene_id: ResourceId,
        /// The light.
        light_id: ResourceId,
    },
    /// Adds a directional light to a scene.
    SceneAddDirectionalLight {
        /// The scene.
        scene_id: ResourceId,
        /// The light.
        light_id: ResourceId,
    },
    /// Adds a point light to a scene.
    SceneAddPointLight {
        /// The scene.
        scene_id: ResourceId,
        /// The light.
        light_id: ResourceId,
    },
    /// Removes a light from its scene.
    DetachLight {
        /// The light.
        light_id: ResourceId,
    },
    /// Removes every light from a scene.
    DetachLights {
        /// The scene.
        scene_id: ResourceId,
    },

    // -- Materials --
    /// Sets or clears a material's texture.
    SetTexture {
        /// The material.
        material_id: ResourceId,
        /// The image, or 0.
        texture_id: ResourceId,
    },
    /// Sets a material's color.
    SetColor {
        /// The material.
        material_id: ResourceId,
        /// The color.
        color: Rgba8,
    },
    /// Mesh geometry. Not supported.
    BindMeshBuffers {
        /// The mesh.
        mesh_id: ResourceId,
    },

    // -- Compositing --
    /// Appends a layer to a layer stack.
    AddLayer {
        /// The stack.
        layer_stack_id: ResourceId,
        /// The layer.
        layer_id: ResourceId,
    },
    /// Removes a layer from a layer stack.
    RemoveLayer {
        /// The stack.
        layer_stack_id: ResourceId,
        /// The layer.
        layer_id: ResourceId,
    },
    /// Empties a layer stack.
    RemoveAllLayers {
        /// The stack.
        layer_stack_id: ResourceId,
    },
    /// Sets or clears a compositor's layer stack.
    SetLayerStack {
        /// The compositor.
        compositor_id: ResourceId,
        /// The stack, or 0.
        layer_stack_id: ResourceId,
    },
    /// Sets or clears the renderer filling a layer.
    SetRenderer {
        /// The layer.
        layer_id: ResourceId,
        /// The renderer, or 0.
        renderer_id: ResourceId,
    },
    /// Changes a renderer setting.
    SetRendererParam {
        /// The renderer.
        renderer_id: ResourceId,
        /// The setting.
        param: RendererParam,
    },
    /// Turns clip planes off for everything a renderer draws.
    SetDisableClipping {
        /// The renderer.
        renderer_id: ResourceId,
        /// Whether clipping is disabled.
        disable_clipping: bool,
    },

    // -- Miscellaneous --
    /// Selects which events a resource reports.
    SetEventMask {
        /// The resource.
        id: ResourceId,
        /// Event bits.
        event_mask: u32,
    },
    /// Sets a resource's diagnostic label.
    SetLabel {
        /// The resource.
        id: ResourceId,
        /// The label. Truncated to the configured maximum.
        label: String,
    },
    /// Legacy import focus control.
    SetImportFocus {
        /// The import.
        id: ResourceId,
    },
    /// Sets a Variable's value.
    SetVariableValue {
        /// The variable.
        variable_id: ResourceId,
        /// The value, which must keep the variable's type.
        value: VariableValue,
    },

    // -- Views and displays --
    /// Shows or hides a View's debug bounds.
    SetEnableViewDebugBounds {
        /// The View.
        view_id: ResourceId,
        /// Whether bounds are drawn.
        display_bounds: bool,
    },
    /// Sets the color of a `ViewHolder`'s debug bounds.
    SetViewHolderBoundsColor {
        /// The `ViewHolder`.
        view_holder_id: ResourceId,
        /// The color.
        color: Rgba8,
    },
    /// Sets a display compositor's color conversion.
    SetDisplayColorConversion {
        /// The compositor.
        compositor_id: ResourceId,
        /// The conversion.
        conversion: ColorConversion,
    },
    /// Sets a display compositor's rotation.
    SetDisplayRotation {
        /// The compositor.
        compositor_id: ResourceId,
        /// One of 0, 90, 180, 270.
        rotation_degrees: u32,
    },
    /// Sets a display compositor's minimum channel value.
    SetDisplayMinimumRgb {
        /// The compositor.
        compositor_id: ResourceId,
        /// Minimum value per channel.
        min_value: u8,
    },
}

impl Command {
    /// The command's name, for diagnostics and tracing.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CreateResource { .. } => "CreateResource",
            Self::ReleaseResource { .. } => "ReleaseResource",
            Self::ExportResource { .. } => "ExportResource",
            Self::ImportResource { .. } => "ImportResource",
            Self::AddChild { .. } => "AddChild",
            Self::AddPart { .. } => "AddPart",
            Self::Detach { .. } => "Detach",
            Self::DetachChildren { .. } => "DetachChildren",
            Self::SetTag { .. } => "SetTag",
            Self::SetTranslation { .. } => "SetTranslation",
            Self::SetScale { .. } => "SetScale",
            Self::SetRotation { .. } => "SetRotation",
            Self::SetAnchor { .. } => "SetAnchor",
            Self::SetSize { .. } => "SetSize",
            Self::SetOpacity { .. } => "SetOpacity",
            Self::SendSizeChangeHint { .. } => "SendSizeChangeHint",
            Self::SetShape { .. } => "SetShape",
            Self::SetMaterial { .. } => "SetMaterial",
            Self::SetClip { .. } => "SetClip",
            Self::SetClipPlanes { .. } => "SetClipPlanes",
            Self::SetHitTestBehavior { .. } => "SetHitTestBehavior",
            Self::SetSemanticVisibility { .. } => "SetSemanticVisibility",
            Self::SetViewProperties { .. } => "SetViewProperties",
            Self::TakeSnapshot { .. } => "TakeSnapshot",
            Self::SetCamera { .. } => "SetCamera",
            Self::SetCameraTransform { .. } => "SetCameraTransform",
            Self::SetCameraProjection { .. } => "SetCameraProjection",
            Self::SetStereoCameraProjection { .. } => "SetStereoCameraProjection",
            Self::SetCameraPoseBuffer { .. } => "SetCameraPoseBuffer",
            Self::SetLightColor { .. } => "SetLightColor",
            Self::SetLightDirection { .. } => "SetLightDirection",
            Self::SetPointLightPosition { .. } => "SetPointLightPosition",
            Self::SetPointLightFalloff { .. } => "SetPointLightFalloff",
            Self::AddLight { .. } => "AddLight",
            Self::SceneAddAmbientLight { .. } => "SceneAddAmbientLight",
            Self::SceneAddDirectionalLight { .. } => "SceneAddDirectionalLight",
            Self::SceneAddPointLight { .. } => "SceneAddPointLight",
            Self::DetachLight { .. } => "DetachLight",
            Self::DetachLights { .. } => "DetachLights",
            Self::SetTexture { .. } => "SetTexture",
            Self::SetColor { .. } => "SetColor",
            Self::BindMeshBuffers { .. } => "BindMeshBuffers",
            Self::AddLayer { .. } => "AddLayer",
            Self::RemoveLayer { .. } => "RemoveLayer",
            Self::RemoveAllLayers { .. } => "RemoveAllLayers",
            Self::SetLayerStack { .. } => "SetLayerStack",
            Self::SetRenderer { .. } => "SetRenderer",
            Self::SetRendererParam { .. } => "SetRendererParam",
            Self::SetDisableClipping { .. } => "SetDisableClipping",
            Self::SetEventMask { .. } => "SetEventMask",
            Self::SetLabel { .. } => "SetLabel",
            Self::SetImportFocus { .. } => "SetImportFocus",
            Self::SetVariableValue { .. } => "SetVariableValue",
            Self::SetEnableViewDebugBounds { .. } => "SetEnableViewDebugBounds",
            Self::SetViewHolderBoundsColor { .. } => "SetViewHolderBoundsColor",
            Self::SetDisplayColorConversion { .. } => "SetDisplayColorConversion",
            Self::SetDisplayRotation { .. } => "SetDisplayRotation",
            Self::SetDisplayMinimumRgb { .. } => "SetDisplayMinimumRgb",
        }
    }

    /// Whether the command is kept only for wire compatibility and always
    /// rejected.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            Self::ExportResource { .. }
                | Self::ImportResource { .. }
                | Self::AddPart { .. }
                | Self::SendSizeChangeHint { .. }
                | Self::TakeSnapshot { .. }
                | Self::AddLight { .. }
                | Self::SetImportFocus { .. }
        )
    }
}
