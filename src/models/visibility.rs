//! Declarative show/hide rules for option sub-panels.
//!
//! Each rule maps an option path prefix to the condition under which the
//! options below it are shown. Visibility is a presentation concern: the
//! serializer never consults these rules.

use crate::models::catalog::is_under;
use crate::models::options::OptionModel;

/// Condition on the current option values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Enum option equals the given member
    Equals(&'static str, &'static str),
    /// Boolean option is set
    IsTrue(&'static str),
    All(&'static [Condition]),
    Any(&'static [Condition]),
}

impl Condition {
    pub fn holds(&self, model: &OptionModel) -> bool {
        match self {
            Condition::Equals(path, expected) => model.choice(path).as_deref() == Some(*expected),
            Condition::IsTrue(path) => model.flag(path),
            Condition::All(conditions) => conditions.iter().all(|c| c.holds(model)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.holds(model)),
        }
    }

    /// Option paths this condition reads
    pub fn controllers(&self) -> Vec<&'static str> {
        match self {
            Condition::Equals(path, _) | Condition::IsTrue(path) => vec![*path],
            Condition::All(conditions) | Condition::Any(conditions) => {
                conditions.iter().flat_map(|c| c.controllers()).collect()
            }
        }
    }
}

/// Options under `prefix` are shown only while `show_when` holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityRule {
    pub prefix: &'static str,
    pub show_when: Condition,
}

const fn rule(prefix: &'static str, show_when: Condition) -> VisibilityRule {
    VisibilityRule { prefix, show_when }
}

use Condition::{All, Any, Equals, IsTrue};

pub const RULES: &[VisibilityRule] = &[
    // Edit
    rule("edit.normals.hardAngleThreshold", IsTrue("edit.normals.recompute")),
    rule("edit.normals.computeMethod", IsTrue("edit.normals.recompute")),
    rule("edit.model", IsTrue("edit.model.enabled")),
    rule("edit.material", IsTrue("edit.material.enabled")),
    // Culling
    rule("culling.occlusion", IsTrue("culling.occlusion.enabled")),
    rule("culling.sizeThreshold", IsTrue("culling.smallFeature.enabled")),
    rule(
        "culling.sizeThreshold.relativePercentage",
        Equals("culling.sizeThreshold.mode", "relativePercentageBbox"),
    ),
    rule("culling.sizeThreshold.value", Equals("culling.sizeThreshold.mode", "value")),
    // Optimize
    rule("optimize", IsTrue("optimize.enabled")),
    rule("optimize.mesh", Equals("optimize.type", "meshAndMaterial")),
    rule("optimize.material.merger", Equals("optimize.material.method", "materialMerger")),
    rule("optimize.material.keep", Equals("optimize.material.method", "keepMaterialAndUvs")),
    rule(
        "optimize.material.regenerator",
        IsTrue("optimize.material.regenerator.enabled"),
    ),
    rule(
        "optimize.material.regenerator.textureBaker",
        IsTrue("optimize.material.regenerator.textureBaker.enabled"),
    ),
    rule("optimize.mesh.decimator", Equals("optimize.mesh.method", "decimator")),
    rule("optimize.mesh.remesher", Equals("optimize.mesh.method", "remesher")),
    rule(
        "optimize.mesh.decimator.target",
        IsTrue("optimize.mesh.decimator.target.enabled"),
    ),
    rule(
        "optimize.mesh.decimator.target.facesMode",
        Equals("optimize.mesh.decimator.target.metric", "faces"),
    ),
    rule(
        "optimize.mesh.decimator.target.facesPercentage",
        All(&[
            Equals("optimize.mesh.decimator.target.metric", "faces"),
            Equals("optimize.mesh.decimator.target.facesMode", "percentage"),
        ]),
    ),
    rule(
        "optimize.mesh.decimator.target.facesValue",
        All(&[
            Equals("optimize.mesh.decimator.target.metric", "faces"),
            Equals("optimize.mesh.decimator.target.facesMode", "value"),
        ]),
    ),
    rule("optimize.mesh.regenerator", IsTrue("optimize.mesh.regenerator.enabled")),
    rule(
        "optimize.mesh.regenerator.textureBaker",
        IsTrue("optimize.mesh.regenerator.textureBaker.enabled"),
    ),
    // Modifier
    rule("modifier", IsTrue("modifier.enabled")),
    rule("modifier.sizeOnScreen", Equals("modifier.type", "sizeOnScreen")),
    // Export
    rule("export.gltf", IsTrue("export.gltf.enabled")),
    rule(
        "export.gltf.pbr.maxTextureResolution.value",
        IsTrue("export.gltf.pbr.maxTextureResolution.enabled"),
    ),
    rule(
        "export.gltf.pbr.textureFormat.value",
        IsTrue("export.gltf.pbr.textureFormat.enabled"),
    ),
    rule("export.gltf.pbr.jpeg", IsTrue("export.gltf.pbr.textureCompression.enabled")),
    rule("export.gltf.pbr.webp", IsTrue("export.gltf.pbr.textureCompression.enabled")),
    rule("export.gltf.pbr.ktx", IsTrue("export.gltf.pbr.textureCompression.enabled")),
    rule(
        "export.gltf.draco",
        Any(&[
            Equals("export.gltf.geometryCompression", "draco"),
            Equals("export.gltf.geometryCompression", "dracoLossy"),
        ]),
    ),
    rule("export.obj", IsTrue("export.obj.enabled")),
    rule(
        "export.obj.mtl.maxTextureResolution.value",
        IsTrue("export.obj.mtl.maxTextureResolution.enabled"),
    ),
    rule("export.fbx", IsTrue("export.fbx.enabled")),
    rule(
        "export.fbx.physicalMaterial.maxTextureResolution.value",
        IsTrue("export.fbx.physicalMaterial.maxTextureResolution.enabled"),
    ),
    rule("export.usdz", IsTrue("export.usdz.enabled")),
    rule(
        "export.usdz.previewSurface.maxTextureResolution.value",
        IsTrue("export.usdz.previewSurface.maxTextureResolution.enabled"),
    ),
];

/// Whether the option at `path` is shown for the current model.
///
/// Every rule whose prefix covers the path must hold, and the options those
/// rules read must themselves be visible. A rule never hides the option it is
/// conditioned on, so toggles stay reachable.
pub fn is_visible(model: &OptionModel, path: &str) -> bool {
    RULES
        .iter()
        .filter(|r| is_under(path, r.prefix))
        .filter(|r| !r.show_when.controllers().contains(&path))
        .all(|r| {
            r.show_when.holds(model)
                && r.show_when
                    .controllers()
                    .iter()
                    .all(|controller| is_visible(model, controller))
        })
}
