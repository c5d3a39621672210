// Copyright 2026 the Tapestry Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turning [`Command`]s into validated store mutations.
//!
//! Every handler first resolves its operands through the issuing session's
//! [`ResourceTable`](crate::resource::ResourceTable) and validates its
//! arguments, and only then mutates. A failed command leaves the graph as it
//! was and reports a diagnostic on the session's error channel.
//!
//! Creation is two steps: build the resource (which may fail on an
//! unresolved dependency or a dead link token), then enter it in the table
//! under the client's id. The table takes the only reference, so a failed
//! insertion releases the new resource and leaks nothing.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::command::{Command, RendererParam, ResourceArgs, Value};
use crate::config::EngineConfig;
use crate::error::{CommandError, ResourceError};
use crate::geometry::Vec3;
use crate::linker::{ExportLink, ImportLink};
use crate::node::{Node, NodeKind, SceneData, ShapeNodeData, TransformProperty};
use crate::resource::{
    Body, Camera, Compositor, Handle, Image, Layer, LayerStack, Light, LightKind, Material,
    Memory, Renderer, ResourceId, ResourceKind, ResourceStore, Shape, TypeFlags, Variable,
};
use crate::session::{METRICS_EVENT_MASK, Session};
use crate::view_tree::ViewTreeUpdate;

/// A link endpoint created for a resource that is not connected yet.
enum PendingLink {
    Export(ExportLink),
    Import(ImportLink),
}

/// Applies one session's commands to the shared store.
#[derive(Debug)]
pub struct GfxCommandApplier<'a> {
    store: &'a mut ResourceStore,
    session: &'a mut Session,
    config: &'a EngineConfig,
}

impl<'a> GfxCommandApplier<'a> {
    /// Creates an applier for `session`.
    pub fn new(
        store: &'a mut ResourceStore,
        session: &'a mut Session,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            store,
            session,
            config,
        }
    }

    /// Applies `command`. On failure, nothing is mutated and a diagnostic is
    /// pushed onto the session's error log.
    pub fn apply(&mut self, command: Command) -> bool {
        let tag = command.tag();
        match self.dispatch(command) {
            Ok(()) => true,
            Err(err) => {
                self.session.report_error(format!("{tag}: {err}"));
                false
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<(), CommandError> {
        let tag = command.tag();
        match command {
            Command::CreateResource { id, resource } => self.create_resource(id, resource),
            Command::ReleaseResource { id } => {
                let handle = self.session.resources.remove(id)?;
                self.store.release(handle);
                Ok(())
            }
            Command::AddChild { node_id, child_id } => {
                let parent = self.find_parent(node_id)?;
                let child = self.find(child_id, TypeFlags::NODE)?;
                self.store.add_child(parent, child)?;
                Ok(())
            }
            Command::Detach { id } => self.detach(id),
            Command::DetachChildren { node_id } => {
                let node = self.find_parent(node_id)?;
                self.store.detach_children(node)?;
                Ok(())
            }
            Command::SetTag { node_id, tag_value } => {
                let node = self.find(node_id, TypeFlags::NODE)?;
                self.with_node(node, |n| n.tag_value = tag_value);
                Ok(())
            }
            Command::SetTranslation { id, value } => {
                self.set_vector(id, TransformProperty::Translation, value)
            }
            Command::SetScale { id, value } => self.set_vector(id, TransformProperty::Scale, value),
            Command::SetAnchor { id, value } => self.set_vector(id, TransformProperty::Anchor, value),
            Command::SetRotation { id, value } => {
                let node = self.find(id, TypeFlags::NODE)?;
                match value {
                    Value::Literal(q) => self.store.set_rotation(node, q),
                    Value::Variable(var) => {
                        let var = self.find(var, TypeFlags::VARIABLE)?;
                        self.store.bind_property(node, TransformProperty::Rotation, var)
                    }
                }
            }
            Command::SetSize { id, width, height } => {
                let layer = self.find(id, TypeFlags::LAYER)?;
                if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                    return Err(CommandError::InvalidArgument("layer size must be positive"));
                }
                if let Body::Layer(l) = self.store.body_mut(layer) {
                    l.width = width;
                    l.height = height;
                }
                Ok(())
            }
            Command::SetOpacity { node_id, opacity } => {
                let node = self.find(node_id, TypeFlags::OPACITY_NODE)?;
                if !(0.0..=1.0).contains(&opacity) {
                    return Err(CommandError::InvalidArgument("opacity must be in [0, 1]"));
                }
                self.with_node(node, |n| n.kind = NodeKind::Opacity { opacity });
                Ok(())
            }
            Command::SetShape { node_id, shape_id } => {
                let node = self.find(node_id, TypeFlags::SHAPE_NODE)?;
                let shape = self.find(shape_id, TypeFlags::SHAPE)?;
                self.set_shape_node_ref(node, |data| &mut data.shape, shape);
                Ok(())
            }
            Command::SetMaterial {
                node_id,
                material_id,
            } => {
                let node = self.find(node_id, TypeFlags::SHAPE_NODE)?;
                let material = self.find(material_id, TypeFlags::MATERIAL)?;
                self.set_shape_node_ref(node, |data| &mut data.material, material);
                Ok(())
            }
            Command::SetClip {
                node_id,
                clip_id,
                clip_to_self,
            } => {
                let node = self.find(node_id, TypeFlags::NODE)?;
                if clip_id != 0 {
                    return Err(CommandError::Unsupported("clipping by node"));
                }
                self.store.set_clip_to_self(node, clip_to_self)?;
                Ok(())
            }
            Command::SetClipPlanes {
                node_id,
                clip_planes,
            } => {
                let node = self.find(node_id, TypeFlags::NODE)?;
                self.store.set_clip_planes(node, clip_planes)
            }
            Command::SetHitTestBehavior { node_id, behavior } => {
                let node = self.find(node_id, TypeFlags::NODE)?;
                self.with_node(node, |n| n.hit_test_behavior = behavior);
                Ok(())
            }
            Command::SetSemanticVisibility { node_id, visible } => {
                let node = self.find(node_id, TypeFlags::NODE)?;
                self.with_node(node, |n| n.semantically_visible = visible);
                Ok(())
            }
            Command::SetViewProperties {
                view_holder_id,
                properties,
            } => {
                let holder = self.find(view_holder_id, TypeFlags::VIEW_HOLDER)?;
                self.store.set_view_properties(holder, properties)
            }

            Command::SetCamera {
                renderer_id,
                camera_id,
            } => {
                let renderer = self.find(renderer_id, TypeFlags::RENDERER)?;
                let camera = self.find_optional(camera_id, TypeFlags::CAMERA)?;
                let old = self.store.renderer(renderer).and_then(|r| r.camera);
                self.store.replace_ref(old, camera);
                if let Body::Renderer(r) = self.store.body_mut(renderer) {
                    r.camera = camera;
                }
                Ok(())
            }
            Command::SetCameraTransform {
                camera_id,
                eye_position,
                eye_look_at,
                eye_up,
            } => {
                let camera = self.find(camera_id, TypeFlags::CAMERA)?;
                if eye_position.is_nan() || eye_look_at.is_nan() || eye_up.is_nan() {
                    return Err(CommandError::InvalidArgument("camera vector component is NaN"));
                }
                if let Body::Camera(c) = self.store.body_mut(camera) {
                    c.eye_position = eye_position;
                    c.eye_look_at = eye_look_at;
                    c.eye_up = eye_up;
                }
                Ok(())
            }
            Command::SetCameraProjection { camera_id, fovy } => {
                let camera = self.find(camera_id, TypeFlags::CAMERA)?;
                if !(fovy.is_finite() && fovy >= 0.0) {
                    return Err(CommandError::InvalidArgument(
                        "field of view must be finite and non-negative",
                    ));
                }
                if let Body::Camera(c) = self.store.body_mut(camera) {
                    c.fovy = fovy;
                }
                Ok(())
            }
            Command::SetStereoCameraProjection { .. }
            | Command::SetCameraPoseBuffer { .. }
            | Command::BindMeshBuffers { .. } => Err(CommandError::Unsupported(tag)),

            Command::SetLightColor { light_id, color } => {
                let light = self.find(light_id, TypeFlags::LIGHT)?;
                if !color.iter().all(|c| c.is_finite() && *c >= 0.0) {
                    return Err(CommandError::InvalidArgument(
                        "light color channels must be finite and non-negative",
                    ));
                }
                if let Body::Light(l) = self.store.body_mut(light) {
                    l.color = color;
                }
                Ok(())
            }
            Command::SetLightDirection {
                light_id,
                direction,
            } => {
                let light = self.find(light_id, TypeFlags::DIRECTIONAL_LIGHT)?;
                if direction.is_nan() || direction == Vec3::ZERO {
                    return Err(CommandError::InvalidArgument(
                        "light direction must be a non-zero vector",
                    ));
                }
                if let Body::Light(Light {
                    kind: LightKind::Directional { direction: d },
                    ..
                }) = self.store.body_mut(light)
                {
                    *d = direction;
                }
                Ok(())
            }
            Command::SetPointLightPosition { light_id, position } => {
                let light = self.find(light_id, TypeFlags::POINT_LIGHT)?;
                if position.is_nan() {
                    return Err(CommandError::InvalidArgument("light position is NaN"));
                }
                if let Body::Light(Light {
                    kind: LightKind::Point { position: p, .. },
                    ..
                }) = self.store.body_mut(light)
                {
                    *p = position;
                }
                Ok(())
            }
            Command::SetPointLightFalloff { light_id, falloff } => {
                let light = self.find(light_id, TypeFlags::POINT_LIGHT)?;
                if !(falloff.is_finite() && falloff >= 0.0) {
                    return Err(CommandError::InvalidArgument(
                        "falloff must be finite and non-negative",
                    ));
                }
                if let Body::Light(Light {
                    kind: LightKind::Point { falloff: f, .. },
                    ..
                }) = self.store.body_mut(light)
                {
                    *f = falloff;
                }
                Ok(())
            }
            Command::SceneAddAmbientLight { scene_id, light_id } => {
                self.scene_add_light(scene_id, light_id, TypeFlags::AMBIENT_LIGHT)
            }
            Command::SceneAddDirectionalLight { scene_id, light_id } => {
                self.scene_add_light(scene_id, light_id, TypeFlags::DIRECTIONAL_LIGHT)
            }
            Command::SceneAddPointLight { scene_id, light_id } => {
                self.scene_add_light(scene_id, light_id, TypeFlags::POINT_LIGHT)
            }
            Command::DetachLight { light_id } => {
                let light = self.find(light_id, TypeFlags::LIGHT)?;
                self.detach_light(light);
                Ok(())
            }
            Command::DetachLights { scene_id } => {
                let scene = self.find(scene_id, TypeFlags::SCENE)?;
                let lights = match self.store.node(scene).map(Node::kind) {
                    Some(NodeKind::Scene(data)) => data.lights.clone(),
                    _ => Vec::new(),
                };
                for light in lights {
                    self.detach_light(light);
                }
                Ok(())
            }

            Command::SetTexture {
                material_id,
                texture_id,
            } => {
                let material = self.find(material_id, TypeFlags::MATERIAL)?;
                let texture = self.find_optional(texture_id, TypeFlags::IMAGE)?;
                let old = self.store.material(material).and_then(|m| m.texture);
                self.store.replace_ref(old, texture);
                if let Body::Material(m) = self.store.body_mut(material) {
                    m.texture = texture;
                }
                Ok(())
            }
            Command::SetColor { material_id, color } => {
                let material = self.find(material_id, TypeFlags::MATERIAL)?;
                if let Body::Material(m) = self.store.body_mut(material) {
                    m.color = color;
                }
                Ok(())
            }

            Command::AddLayer {
                layer_stack_id,
                layer_id,
            } => {
                let stack = self.find(layer_stack_id, TypeFlags::LAYER_STACK)?;
                let layer = self.find(layer_id, TypeFlags::LAYER)?;
                match self.layer_stack_of(layer) {
                    Some(current) if current == stack => return Ok(()),
                    Some(_) => {
                        return Err(CommandError::InvalidArgument(
                            "layer already belongs to another layer stack",
                        ));
                    }
                    None => {}
                }
                self.store.retain(layer);
                if let Body::LayerStack(s) = self.store.body_mut(stack) {
                    s.layers.push(layer);
                }
                if let Body::Layer(l) = self.store.body_mut(layer) {
                    l.stack = Some(stack);
                }
                Ok(())
            }
            Command::RemoveLayer {
                layer_stack_id,
                layer_id,
            } => {
                let stack = self.find(layer_stack_id, TypeFlags::LAYER_STACK)?;
                let layer = self.find(layer_id, TypeFlags::LAYER)?;
                if self.layer_stack_of(layer) != Some(stack) {
                    return Err(CommandError::InvalidArgument(
                        "layer is not in this layer stack",
                    ));
                }
                if let Body::LayerStack(s) = self.store.body_mut(stack) {
                    s.layers.retain(|&l| l != layer);
                }
                if let Body::Layer(l) = self.store.body_mut(layer) {
                    l.stack = None;
                }
                self.store.release(layer);
                Ok(())
            }
            Command::RemoveAllLayers { layer_stack_id } => {
                let stack = self.find(layer_stack_id, TypeFlags::LAYER_STACK)?;
                let layers = match self.store.body_mut(stack) {
                    Body::LayerStack(s) => core::mem::take(&mut s.layers),
                    _ => Vec::new(),
                };
                for layer in layers {
                    if let Body::Layer(l) = self.store.body_mut(layer) {
                        l.stack = None;
                    }
                    self.store.release(layer);
                }
                Ok(())
            }
            Command::SetLayerStack {
                compositor_id,
                layer_stack_id,
            } => {
                let compositor = self.find(compositor_id, TypeFlags::COMPOSITOR)?;
                let stack = self.find_optional(layer_stack_id, TypeFlags::LAYER_STACK)?;
                let old = self.store.compositor(compositor).and_then(|c| c.layer_stack);
                self.store.replace_ref(old, stack);
                if let Body::Compositor(c) = self.store.body_mut(compositor) {
                    c.layer_stack = stack;
                }
                Ok(())
            }
            Command::SetRenderer {
                layer_id,
                renderer_id,
            } => {
                let layer = self.find(layer_id, TypeFlags::LAYER)?;
                let renderer = self.find_optional(renderer_id, TypeFlags::RENDERER)?;
                let old = self.store.layer(layer).and_then(|l| l.renderer);
                self.store.replace_ref(old, renderer);
                if let Body::Layer(l) = self.store.body_mut(layer) {
                    l.renderer = renderer;
                }
                Ok(())
            }
            Command::SetRendererParam { renderer_id, param } => {
                let renderer = self.find(renderer_id, TypeFlags::RENDERER)?;
                match param {
                    RendererParam::ShadowTechnique(technique) => {
                        if let Body::Renderer(r) = self.store.body_mut(renderer) {
                            r.shadow_technique = technique;
                        }
                        Ok(())
                    }
                    RendererParam::EnableDebugging(_) => {
                        Err(CommandError::Deprecated("renderer debugging"))
                    }
                }
            }
            Command::SetDisableClipping {
                renderer_id,
                disable_clipping,
            } => {
                let renderer = self.find(renderer_id, TypeFlags::RENDERER)?;
                if let Body::Renderer(r) = self.store.body_mut(renderer) {
                    r.disable_clipping = disable_clipping;
                }
                Ok(())
            }

            Command::SetEventMask { id, event_mask } => {
                let (handle, _) = self
                    .session
                    .resources
                    .get(id)
                    .ok_or(ResourceError::NotFound(id))?;
                let newly_metered = event_mask & METRICS_EVENT_MASK != 0
                    && self.store.event_mask(handle) & METRICS_EVENT_MASK == 0;
                self.store.set_event_mask(handle, event_mask);
                if newly_metered {
                    // Forces a report on the next update.
                    self.with_node(handle, |n| n.reported_scale = None);
                }
                Ok(())
            }
            Command::SetLabel { id, label } => {
                let (handle, _) = self
                    .session
                    .resources
                    .get(id)
                    .ok_or(ResourceError::NotFound(id))?;
                let label: String = label.chars().take(self.config.label_max_len).collect();
                self.store.set_label(handle, label);
                Ok(())
            }
            Command::SetVariableValue { variable_id, value } => {
                let variable = self.find(variable_id, TypeFlags::VARIABLE)?;
                self.store.set_variable_value(variable, value)
            }

            Command::SetEnableViewDebugBounds {
                view_id,
                display_bounds,
            } => {
                let view = self.find(view_id, TypeFlags::VIEW)?;
                self.store.set_view_debug_bounds(view, display_bounds);
                Ok(())
            }
            Command::SetViewHolderBoundsColor {
                view_holder_id,
                color,
            } => {
                let holder = self.find(view_holder_id, TypeFlags::VIEW_HOLDER)?;
                self.store.set_view_holder_bounds_color(holder, color);
                Ok(())
            }
            Command::SetDisplayColorConversion {
                compositor_id,
                conversion,
            } => {
                let compositor = self.find(compositor_id, TypeFlags::DISPLAY_COMPOSITOR)?;
                if !conversion.is_finite() {
                    return Err(CommandError::InvalidArgument(
                        "color conversion must be finite",
                    ));
                }
                if let Body::Compositor(c) = self.store.body_mut(compositor) {
                    c.color_conversion = conversion;
                }
                Ok(())
            }
            Command::SetDisplayRotation {
                compositor_id,
                rotation_degrees,
            } => {
                let compositor = self.find(compositor_id, TypeFlags::DISPLAY_COMPOSITOR)?;
                if !matches!(rotation_degrees, 0 | 90 | 180 | 270) {
                    return Err(CommandError::InvalidArgument(
                        "display rotation must be 0, 90, 180, or 270 degrees",
                    ));
                }
                if let Body::Compositor(c) = self.store.body_mut(compositor) {
                    c.rotation_degrees = rotation_degrees;
                }
                Ok(())
            }
            Command::SetDisplayMinimumRgb {
                compositor_id,
                min_value,
            } => {
                let compositor = self.find(compositor_id, TypeFlags::DISPLAY_COMPOSITOR)?;
                if let Body::Compositor(c) = self.store.body_mut(compositor) {
                    c.minimum_rgb = min_value;
                }
                Ok(())
            }

            Command::ExportResource { .. }
            | Command::ImportResource { .. }
            | Command::AddPart { .. }
            | Command::SendSizeChangeHint { .. }
            | Command::TakeSnapshot { .. }
            | Command::AddLight { .. }
            | Command::SetImportFocus { .. } => Err(CommandError::Deprecated(tag)),
        }
    }

    // -- Creation --

    fn create_resource(&mut self, id: ResourceId, args: ResourceArgs) -> Result<(), CommandError> {
        // Nothing is built for an id the table would refuse.
        self.session.resources.check_add(id)?;
        let session = self.session.id();
        let mut pending_link = None;
        let mut scene_koid = None;

        let handle = match args {
            ResourceArgs::Memory { size, is_protected } => self
                .store
                .insert(session, id, Body::Memory(Memory { size, is_protected })),
            ResourceArgs::Image {
                memory_id,
                width,
                height,
            } => {
                let memory = self.find(memory_id, TypeFlags::MEMORY)?;
                if width == 0 || height == 0 {
                    return Err(CommandError::InvalidArgument(
                        "image dimensions must be positive",
                    ));
                }
                self.store.retain(memory);
                self.store.insert(
                    session,
                    id,
                    Body::Image(Image {
                        memory,
                        width,
                        height,
                    }),
                )
            }
            ResourceArgs::Rectangle { width, height } => {
                self.insert_shape(id, Shape::Rectangle { width, height })?
            }
            ResourceArgs::RoundedRectangle {
                width,
                height,
                top_left_radius,
                top_right_radius,
                bottom_right_radius,
                bottom_left_radius,
            } => self.insert_shape(
                id,
                Shape::RoundedRectangle {
                    width,
                    height,
                    top_left_radius,
                    top_right_radius,
                    bottom_right_radius,
                    bottom_left_radius,
                },
            )?,
            ResourceArgs::Circle { radius } => self.insert_shape(id, Shape::Circle { radius })?,
            ResourceArgs::Material => {
                self.store
                    .insert(session, id, Body::Material(Material::default()))
            }
            ResourceArgs::EntityNode => self.insert_node(id, NodeKind::Entity),
            ResourceArgs::ShapeNode => {
                self.insert_node(id, NodeKind::Shape(ShapeNodeData::default()))
            }
            ResourceArgs::OpacityNode => self.insert_node(id, NodeKind::Opacity { opacity: 1.0 }),
            ResourceArgs::Scene { view_ref } => {
                scene_koid = Some(view_ref.koid());
                self.insert_node(
                    id,
                    NodeKind::Scene(SceneData {
                        view_ref,
                        lights: Vec::new(),
                    }),
                )
            }
            ResourceArgs::View {
                token,
                view_ref,
                debug_name,
            } => {
                let link = self.store.linker.create_import(token)?;
                pending_link = Some(PendingLink::Import(link));
                self.store.create_view(
                    session,
                    id,
                    view_ref,
                    debug_name.unwrap_or_default(),
                    self.config.view_debug_bounds,
                )
            }
            ResourceArgs::ViewHolder { token, debug_name } => {
                let link = self.store.linker.create_export(token)?;
                pending_link = Some(PendingLink::Export(link));
                self.store.create_view_holder(
                    session,
                    id,
                    debug_name.unwrap_or_default(),
                    self.config.default_bounds_color,
                )
            }
            ResourceArgs::Camera { scene_id } => {
                let scene = self.find(scene_id, TypeFlags::SCENE)?;
                self.store.retain(scene);
                self.store
                    .insert(session, id, Body::Camera(Camera::new(scene)))
            }
            ResourceArgs::Renderer => {
                self.store
                    .insert(session, id, Body::Renderer(Renderer::default()))
            }
            ResourceArgs::AmbientLight => self.insert_light(id, LightKind::Ambient),
            ResourceArgs::DirectionalLight => self.insert_light(
                id,
                LightKind::Directional {
                    direction: Vec3::new(0.0, 0.0, -1.0),
                },
            ),
            ResourceArgs::PointLight => self.insert_light(
                id,
                LightKind::Point {
                    position: Vec3::ZERO,
                    falloff: 1.0,
                },
            ),
            ResourceArgs::Layer => self.store.insert(session, id, Body::Layer(Layer::default())),
            ResourceArgs::LayerStack => {
                self.store
                    .insert(session, id, Body::LayerStack(LayerStack::default()))
            }
            ResourceArgs::Compositor => {
                self.store
                    .insert(session, id, Body::Compositor(Compositor::new(false)))
            }
            ResourceArgs::DisplayCompositor => {
                self.store
                    .insert(session, id, Body::Compositor(Compositor::new(true)))
            }
            ResourceArgs::Variable { initial } => {
                if initial.is_nan() {
                    return Err(CommandError::InvalidArgument("variable value is NaN"));
                }
                self.store
                    .insert(session, id, Body::Variable(Variable::new(initial)))
            }
        };

        let connected = match pending_link {
            Some(PendingLink::Export(link)) => self.store.connect_view_holder(handle, link),
            Some(PendingLink::Import(link)) => self.store.connect_view(handle, link),
            None => Ok(()),
        };
        if let Err(err) = connected {
            self.store.release(handle);
            return Err(err.into());
        }
        if let Some(koid) = scene_koid {
            self.store.push_view_tree_update(
                session,
                ViewTreeUpdate::NewRefNode {
                    koid,
                    session,
                    may_receive_focus: true,
                },
            );
        }

        // Cannot fail after `check_add`. A release here still pairs every
        // queued view-tree update with its removal.
        let kind = self.store.kind(handle);
        if let Err(err) = self.session.resources.add(id, handle, kind) {
            self.store.release(handle);
            return Err(err.into());
        }
        Ok(())
    }

    fn insert_shape(&mut self, id: ResourceId, shape: Shape) -> Result<Handle, CommandError> {
        if !shape.is_valid() {
            return Err(CommandError::InvalidArgument(
                "shape dimensions must be positive",
            ));
        }
        Ok(self.store.insert(self.session.id(), id, Body::Shape(shape)))
    }

    fn insert_node(&mut self, id: ResourceId, kind: NodeKind) -> Handle {
        self.store
            .insert(self.session.id(), id, Body::Node(Node::new(kind)))
    }

    fn insert_light(&mut self, id: ResourceId, kind: LightKind) -> Handle {
        self.store
            .insert(self.session.id(), id, Body::Light(Light::new(kind)))
    }

    // -- Helpers --

    fn find(&self, id: ResourceId, required: TypeFlags) -> Result<Handle, ResourceError> {
        self.session.resources.find(id, required)
    }

    /// Resolves a node that gains or loses children. Views resolve to their
    /// anchor.
    fn find_parent(&self, id: ResourceId) -> Result<Handle, ResourceError> {
        if let Some((handle, ResourceKind::View)) = self.session.resources.get(id)
            && let Some(view) = self.store.view(handle)
        {
            return Ok(view.anchor());
        }
        self.find(id, TypeFlags::NODE)
    }

    /// Like `find`, but id 0 means "none".
    fn find_optional(
        &self,
        id: ResourceId,
        required: TypeFlags,
    ) -> Result<Option<Handle>, ResourceError> {
        if id == 0 {
            Ok(None)
        } else {
            self.find(id, required).map(Some)
        }
    }

    fn with_node(&mut self, node: Handle, f: impl FnOnce(&mut Node)) {
        if let Some(n) = self.store.node_mut(node) {
            f(n);
        }
    }

    fn set_vector(
        &mut self,
        id: ResourceId,
        property: TransformProperty,
        value: Value<Vec3>,
    ) -> Result<(), CommandError> {
        let node = self.find(id, TypeFlags::NODE)?;
        match value {
            Value::Literal(v) => self.store.set_vector_property(node, property, v),
            Value::Variable(var) => {
                let var = self.find(var, TypeFlags::VARIABLE)?;
                self.store.bind_property(node, property, var)
            }
        }
    }

    fn set_shape_node_ref(
        &mut self,
        node: Handle,
        field: fn(&mut ShapeNodeData) -> &mut Option<Handle>,
        value: Handle,
    ) {
        let old = match self.store.node_mut(node).map(|n| &mut n.kind) {
            Some(NodeKind::Shape(data)) => *field(data),
            _ => return,
        };
        self.store.replace_ref(old, Some(value));
        if let Some(Node {
            kind: NodeKind::Shape(data),
            ..
        }) = self.store.node_mut(node)
        {
            *field(data) = Some(value);
        }
    }

    fn detach(&mut self, id: ResourceId) -> Result<(), CommandError> {
        let (handle, kind) = self
            .session
            .resources
            .get(id)
            .ok_or(ResourceError::NotFound(id))?;
        let flags = kind.type_flags();
        if flags.contains(TypeFlags::LIGHT) {
            self.detach_light(handle);
            return Ok(());
        }
        if !flags.contains(TypeFlags::NODE) {
            return Err(ResourceError::WrongType {
                id,
                actual: kind,
                expected: TypeFlags::NODE,
            }
            .into());
        }
        self.store.detach(handle);
        Ok(())
    }

    fn scene_add_light(
        &mut self,
        scene_id: ResourceId,
        light_id: ResourceId,
        light_type: TypeFlags,
    ) -> Result<(), CommandError> {
        let scene = self.find(scene_id, TypeFlags::SCENE)?;
        let light = self.find(light_id, light_type)?;
        let current = self.light_scene_of(light);
        if current == Some(scene) {
            return Ok(());
        }
        self.store.retain(light);
        self.detach_light(light);
        if let Some(Node {
            kind: NodeKind::Scene(data),
            ..
        }) = self.store.node_mut(scene)
        {
            data.lights.push(light);
        }
        if let Body::Light(l) = self.store.body_mut(light) {
            l.scene = Some(scene);
        }
        Ok(())
    }

    /// Removes `light` from its scene, dropping the scene's reference.
    fn detach_light(&mut self, light: Handle) {
        let Some(scene) = self.light_scene_of(light) else {
            return;
        };
        if let Body::Light(l) = self.store.body_mut(light) {
            l.scene = None;
        }
        if let Some(Node {
            kind: NodeKind::Scene(data),
            ..
        }) = self.store.node_mut(scene)
        {
            data.lights.retain(|&l| l != light);
        }
        self.store.release(light);
    }

    /// The live scene holding `light`. A destroyed scene already released
    /// its lights.
    fn light_scene_of(&self, light: Handle) -> Option<Handle> {
        self.store
            .light(light)
            .and_then(|l| l.scene)
            .filter(|&scene| self.store.is_alive(scene))
    }

    /// The live layer stack holding `layer`.
    fn layer_stack_of(&self, layer: Handle) -> Option<Handle> {
        self.store
            .layer(layer)
            .and_then(|l| l.stack)
            .filter(|&stack| self.store.is_alive(stack))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;
    use crate::geometry::{BoundingBox, Plane3, Quaternion};
    use crate::koid::{ViewRef, token_pair};
    use crate::resource::{SessionId, VariableValue};
    use crate::view::ViewProperties;

    struct Fixture {
        store: ResourceStore,
        session: Session,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: ResourceStore::new(),
                session: Session::new(SessionId(1), 64),
                config: EngineConfig::new(),
            }
        }

        fn apply(&mut self, command: Command) -> bool {
            GfxCommandApplier::new(&mut self.store, &mut self.session, &self.config).apply(command)
        }

        fn create(&mut self, id: ResourceId, resource: ResourceArgs) {
            assert!(
                self.apply(Command::CreateResource { id, resource }),
                "{:?}",
                self.session.take_errors()
            );
        }

        fn handle(&self, id: ResourceId) -> Handle {
            self.session.resources.get(id).unwrap().0
        }
    }

    #[test]
    fn failed_command_reports_and_leaves_graph_untouched() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::EntityNode);
        f.create(2, ResourceArgs::ShapeNode);

        assert!(!f.apply(Command::AddChild {
            node_id: 2,
            child_id: 1
        }));
        assert_eq!(f.store.parent(f.handle(1)), None);
        let errors = f.session.take_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("AddChild:"), "{errors:?}");

        assert!(!f.apply(Command::SetTag {
            node_id: 99,
            tag_value: 1
        }));
        assert_eq!(
            f.session.take_errors(),
            vec![format!("SetTag: {}", ResourceError::NotFound(99))]
        );
    }

    #[test]
    fn duplicate_id_creates_nothing() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::EntityNode);
        let before = f.store.len();
        assert!(!f.apply(Command::CreateResource {
            id: 1,
            resource: ResourceArgs::Material,
        }));
        assert_eq!(f.store.len(), before);
        assert!(!f.apply(Command::CreateResource {
            id: 0,
            resource: ResourceArgs::Material,
        }));
    }

    #[test]
    fn unresolved_dependency_fails_creation() {
        let mut f = Fixture::new();
        assert!(!f.apply(Command::CreateResource {
            id: 1,
            resource: ResourceArgs::Camera { scene_id: 7 },
        }));
        assert!(f.session.resources.is_empty());
        assert!(f.store.is_empty());
    }

    #[test]
    fn invalid_shape_is_rejected() {
        let mut f = Fixture::new();
        assert!(!f.apply(Command::CreateResource {
            id: 1,
            resource: ResourceArgs::Circle { radius: -1.0 },
        }));
        assert!(f.store.is_empty());
    }

    #[test]
    fn legacy_commands_are_rejected() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::EntityNode);
        f.create(2, ResourceArgs::EntityNode);
        assert!(!f.apply(Command::AddPart {
            node_id: 1,
            part_id: 2
        }));
        assert!(!f.apply(Command::ExportResource { id: 1 }));
        assert_eq!(f.store.parent(f.handle(2)), None);
        let errors = f.session.take_errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("deprecated"), "{errors:?}");
    }

    #[test]
    fn material_survives_release_while_referenced() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::ShapeNode);
        f.create(2, ResourceArgs::Material);
        let material = f.handle(2);
        assert!(f.apply(Command::SetMaterial {
            node_id: 1,
            material_id: 2
        }));
        assert!(f.apply(Command::ReleaseResource { id: 2 }));
        assert!(f.store.is_alive(material), "the ShapeNode still owns it");

        assert!(f.apply(Command::ReleaseResource { id: 1 }));
        assert!(!f.store.is_alive(material));
    }

    #[test]
    fn opacity_and_color_validation() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::OpacityNode);
        assert!(f.apply(Command::SetOpacity {
            node_id: 1,
            opacity: 0.5
        }));
        assert_eq!(f.store.node(f.handle(1)).unwrap().opacity(), 0.5);
        assert!(!f.apply(Command::SetOpacity {
            node_id: 1,
            opacity: 1.5
        }));
        assert!(!f.apply(Command::SetOpacity {
            node_id: 1,
            opacity: f32::NAN
        }));
        assert_eq!(f.store.node(f.handle(1)).unwrap().opacity(), 0.5);
    }

    #[test]
    fn transform_can_follow_a_variable() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::EntityNode);
        f.create(
            2,
            ResourceArgs::Variable {
                initial: VariableValue::Vector3(Vec3::new(1.0, 2.0, 3.0)),
            },
        );
        f.create(
            3,
            ResourceArgs::Variable {
                initial: VariableValue::Quaternion(Quaternion::IDENTITY),
            },
        );
        assert!(f.apply(Command::SetTranslation {
            id: 1,
            value: Value::Variable(2)
        }));
        assert!(
            !f.apply(Command::SetTranslation {
                id: 1,
                value: Value::Variable(3)
            }),
            "quaternion cannot drive a translation"
        );
        assert!(f.apply(Command::SetVariableValue {
            variable_id: 2,
            value: VariableValue::Vector3(Vec3::new(4.0, 5.0, 6.0)),
        }));
        let node = f.store.node(f.handle(1)).unwrap();
        assert_eq!(node.translation().value, Vec3::new(4.0, 5.0, 6.0));

        assert!(f.apply(Command::SetTranslation {
            id: 1,
            value: Value::Literal(Vec3::ZERO)
        }));
        let variable = f.store.variable(f.handle(2)).unwrap();
        assert!(variable.bindings.is_empty(), "literal replaces the binding");
    }

    #[test]
    fn clip_planes_can_be_cleared() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::EntityNode);
        let plane = Plane3::new(Vec3::new(1.0, 0.0, 0.0), 0.0);
        assert!(f.apply(Command::SetClipPlanes {
            node_id: 1,
            clip_planes: vec![plane, plane],
        }));
        assert_eq!(f.store.node(f.handle(1)).unwrap().clip_planes().len(), 2);
        assert!(f.apply(Command::SetClipPlanes {
            node_id: 1,
            clip_planes: Vec::new(),
        }));
        assert_eq!(f.store.node(f.handle(1)).unwrap().clip_planes().len(), 0);
    }

    #[test]
    fn lights_move_between_scenes() {
        let mut f = Fixture::new();
        f.create(
            1,
            ResourceArgs::Scene {
                view_ref: ViewRef::new(),
            },
        );
        f.create(
            2,
            ResourceArgs::Scene {
                view_ref: ViewRef::new(),
            },
        );
        f.create(3, ResourceArgs::PointLight);
        let light = f.handle(3);
        let lights_of = |f: &Fixture, id| match f.store.node(f.handle(id)).unwrap().kind() {
            NodeKind::Scene(data) => data.lights.clone(),
            _ => Vec::new(),
        };

        assert!(!f.apply(Command::SceneAddAmbientLight {
            scene_id: 1,
            light_id: 3
        }));
        assert!(f.apply(Command::SceneAddPointLight {
            scene_id: 1,
            light_id: 3
        }));
        assert!(f.apply(Command::SceneAddPointLight {
            scene_id: 2,
            light_id: 3
        }));
        assert!(lights_of(&f, 1).is_empty());
        assert_eq!(lights_of(&f, 2), [light]);
        assert_eq!(f.store.ref_count(light), 2);

        assert!(f.apply(Command::DetachLights { scene_id: 2 }));
        assert!(lights_of(&f, 2).is_empty());
        assert_eq!(f.store.ref_count(light), 1);
    }

    #[test]
    fn compositor_chain_references() {
        let mut f = Fixture::new();
        f.create(1, ResourceArgs::DisplayCompositor);
        f.create(2, ResourceArgs::LayerStack);
        f.create(3, ResourceArgs::Layer);
        f.create(4, ResourceArgs::LayerStack);
        assert!(f.apply(Command::SetLayerStack {
            compositor_id: 1,
            layer_stack_id: 2
        }));
        assert!(f.apply(Command::AddLayer {
            layer_stack_id: 2,
            layer_id: 3
        }));
        assert!(
            !f.apply(Command::AddLayer {
                layer_stack_id: 4,
                layer_id: 3
            }),
            "a layer belongs to one stack"
        );
        assert!(!f.apply(Command::SetSize {
            id: 3,
            width: 0.0,
            height: 10.0
        }));
        assert!(f.apply(Command::SetSize {
            id: 3,
            width: 10.0,
            height: 10.0
        }));
        assert!(f.apply(Command::RemoveLayer {
            layer_stack_id: 2,
            layer_id: 3
        }));
        assert!(f.store.layer_stack(f.handle(2)).unwrap().layers.is_empty());
        assert!(!f.apply(Command::SetDisplayRotation {
            compositor_id: 1,
            rotation_degrees: 45
        }));
        assert!(f.apply(Command::SetDisplayRotation {
            compositor_id: 1,
            rotation_degrees: 90
        }));
    }

    #[test]
    fn labels_are_truncated() {
        let mut f = Fixture::new();
        f.config.label_max_len = 4;
        f.create(1, ResourceArgs::EntityNode);
        assert!(f.apply(Command::SetLabel {
            id: 1,
            label: "background".to_string(),
        }));
        assert_eq!(f.store.label(f.handle(1)), "back");
    }

    #[test]
    fn view_holder_creation_tracks_it() {
        let mut f = Fixture::new();
        let (export, _import) = token_pair();
        f.create(
            1,
            ResourceArgs::ViewHolder {
                token: export,
                debug_name: Some("child".to_string()),
            },
        );
        let outbox = f.store.take_outbox();
        assert_eq!(outbox.view_tree.len(), 1);
        assert!(f.apply(Command::SetViewProperties {
            view_holder_id: 1,
            properties: ViewProperties {
                bounding_box: BoundingBox::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 10.0)),
                ..ViewProperties::default()
            },
        }));
        assert_eq!(
            f.store.node(f.handle(1)).unwrap().clip_planes().len(),
            6,
            "holder clips to its bounds"
        );
    }

    #[test]
    fn refused_ids_build_nothing() {
        let mut f = Fixture {
            session: Session::new(SessionId(1), 1),
            ..Fixture::new()
        };
        f.create(1, ResourceArgs::EntityNode);
        let live = f.store.len();

        assert!(!f.apply(Command::CreateResource {
            id: 2,
            resource: ResourceArgs::Scene {
                view_ref: ViewRef::new(),
            },
        }));
        let (export, _import) = token_pair();
        assert!(!f.apply(Command::CreateResource {
            id: 1,
            resource: ResourceArgs::ViewHolder {
                token: export,
                debug_name: None,
            },
        }));
        let errors = f.session.take_errors();
        assert_eq!(
            errors,
            vec![
                format!("CreateResource: {}", ResourceError::LimitExceeded(1)),
                format!("CreateResource: {}", ResourceError::DuplicateId(1)),
            ]
        );
        assert_eq!(f.store.len(), live);
        assert_eq!(
            f.session.resources.get(1).map(|(_, kind)| kind),
            Some(ResourceKind::EntityNode)
        );
        let outbox = f.store.take_outbox();
        assert!(outbox.view_tree.is_empty(), "no view tree entry to delete");
    }

    #[test]
    fn view_ids_stand_for_their_anchor() {
        let mut f = Fixture::new();
        let (_export, import) = token_pair();
        f.create(1, ResourceArgs::View {
            token: import,
            view_ref: ViewRef::new(),
            debug_name: None,
        });
        f.create(2, ResourceArgs::EntityNode);
        let anchor = f.store.view(f.handle(1)).unwrap().anchor();

        assert!(f.apply(Command::AddChild {
            node_id: 1,
            child_id: 2
        }));
        assert_eq!(f.store.parent(f.handle(2)), Some(anchor));
        assert!(f.apply(Command::DetachChildren { node_id: 1 }));
        assert_eq!(f.store.parent(f.handle(2)), None);
    }

    #[test]
    fn dead_token_fails_view_creation() {
        let mut f = Fixture::new();
        let (export, import) = token_pair();
        drop(export);
        assert!(!f.apply(Command::CreateResource {
            id: 1,
            resource: ResourceArgs::View {
                token: import,
                view_ref: ViewRef::new(),
                debug_name: None,
            },
        }));
        assert!(f.store.is_empty());
    }
}
