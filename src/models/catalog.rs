//! Static declaration of every processor option.
//!
//! Each [`OptionSpec`] carries the dotted path used in the JSON documents, a
//! display label, the value kind with its allowed set or range, the default and
//! whether the processor requires it to be present. The catalog is the single
//! source of truth for validation in [`OptionModel`](crate::models::OptionModel)
//! and for default filling in the serializer.

use crate::models::options::{OptionError, OptionValue};
use indexmap::IndexMap;
use std::sync::LazyLock;

// Shared allowed sets
const AUTO_OR_OPACITY: &[&str] = &["auto", "byOpacity"];
const UV_ATLAS_MODES: &[&str] = &["single", "separateAlpha", "separateNormals"];
const PACKING_RESOLUTIONS: &[i64] = &[512, 1024, 2048, 4096];
const TEXTURE_FORMATS: &[&str] = &["auto", "jpg", "png", "png8", "webp"];
const REGENERATOR_MODES: &[&str] = &["generateUvAtlas", "materialReplacer"];
const UNWRAPPING_METHODS: &[&str] = &[
    "isometric",
    "forwardBijective",
    "fixedBoundary",
    "fastConformal",
    "conformal",
];

/// Value kind of an option together with its constraint and default
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    Bool {
        default: bool,
    },
    Int {
        min: i64,
        max: i64,
        default: i64,
    },
    Float {
        min: f64,
        max: f64,
        default: f64,
    },
    /// String enum, serialized verbatim
    Choice {
        allowed: &'static [&'static str],
        default: &'static str,
    },
    /// Integer restricted to a fixed set (texture resolutions)
    IntChoice {
        allowed: &'static [i64],
        default: i64,
    },
}

/// Declaration of a single option
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub path: String,
    pub label: &'static str,
    pub kind: OptionKind,
    pub required: bool,
}

impl OptionSpec {
    /// Top-level section the option belongs to
    pub fn section(&self) -> &str {
        self.path.split('.').next().unwrap_or_default()
    }

    pub fn default_value(&self) -> OptionValue {
        match &self.kind {
            OptionKind::Bool { default } => OptionValue::Bool(*default),
            OptionKind::Int { default, .. } => OptionValue::Int(*default),
            OptionKind::Float { default, .. } => OptionValue::Float(*default),
            OptionKind::Choice { default, .. } => OptionValue::Enum(default.to_string()),
            OptionKind::IntChoice { default, .. } => OptionValue::Int(*default),
        }
    }

    /// Type name expected by this option
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            OptionKind::Bool { .. } => "bool",
            OptionKind::Int { .. } | OptionKind::IntChoice { .. } => "int",
            OptionKind::Float { .. } => "float",
            OptionKind::Choice { .. } => "enum",
        }
    }

    /// Human readable constraint, e.g. `enum [auto, byOpacity]` or `int 1..=20`
    pub fn describe(&self) -> String {
        match &self.kind {
            OptionKind::Bool { .. } => "bool".to_string(),
            OptionKind::Int { min, max, .. } => format!("int {}..={}", min, max),
            OptionKind::Float { min, max, .. } => format!("float {}..={}", min, max),
            OptionKind::Choice { allowed, .. } => format!("enum [{}]", allowed.join(", ")),
            OptionKind::IntChoice { allowed, .. } => format!("int [{}]", join_ints(allowed)),
        }
    }

    /// Check a value against this declaration and return it in canonical form.
    ///
    /// The only conversion performed is int → float for float options.
    pub fn check(&self, value: &OptionValue) -> Result<OptionValue, OptionError> {
        match (&self.kind, value) {
            (OptionKind::Bool { .. }, OptionValue::Bool(_)) => Ok(value.clone()),

            (OptionKind::Int { min, max, .. }, OptionValue::Int(i)) => {
                if (*min..=*max).contains(i) {
                    Ok(value.clone())
                } else {
                    Err(self.out_of_range(i.to_string(), min.to_string(), max.to_string()))
                }
            }

            (OptionKind::Float { min, max, .. }, OptionValue::Float(v)) => self.check_float(*v, *min, *max),
            (OptionKind::Float { min, max, .. }, OptionValue::Int(i)) => {
                self.check_float(*i as f64, *min, *max)
            }

            (OptionKind::Choice { allowed, .. }, OptionValue::Enum(s)) => {
                if allowed.contains(&s.as_str()) {
                    Ok(value.clone())
                } else {
                    Err(OptionError::NotAllowed {
                        path: self.path.clone(),
                        value: s.clone(),
                        allowed: allowed.join(", "),
                    })
                }
            }

            (OptionKind::IntChoice { allowed, .. }, OptionValue::Int(i)) => {
                if allowed.contains(i) {
                    Ok(value.clone())
                } else {
                    Err(OptionError::NotAllowed {
                        path: self.path.clone(),
                        value: i.to_string(),
                        allowed: join_ints(allowed),
                    })
                }
            }

            _ => Err(OptionError::TypeMismatch {
                path: self.path.clone(),
                expected: self.kind_name(),
                found: value.type_name(),
            }),
        }
    }

    /// Parse a textual value according to this option's kind, then check it
    pub fn parse(&self, raw: &str) -> Result<OptionValue, OptionError> {
        let raw = raw.trim();
        let unparseable = || OptionError::Unparseable {
            path: self.path.clone(),
            raw: raw.to_string(),
        };

        let value = match self.kind {
            OptionKind::Bool { .. } => match raw.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => OptionValue::Bool(true),
                "false" | "off" | "no" | "0" => OptionValue::Bool(false),
                _ => return Err(unparseable()),
            },
            OptionKind::Int { .. } | OptionKind::IntChoice { .. } => {
                OptionValue::Int(raw.parse().map_err(|_| unparseable())?)
            }
            OptionKind::Float { .. } => OptionValue::Float(raw.parse().map_err(|_| unparseable())?),
            OptionKind::Choice { .. } => OptionValue::Enum(raw.to_string()),
        };

        self.check(&value)
    }

    fn check_float(&self, v: f64, min: f64, max: f64) -> Result<OptionValue, OptionError> {
        if (min..=max).contains(&v) {
            Ok(OptionValue::Float(v))
        } else {
            Err(self.out_of_range(v.to_string(), min.to_string(), max.to_string()))
        }
    }

    fn out_of_range(&self, value: String, min: String, max: String) -> OptionError {
        OptionError::OutOfRange {
            path: self.path.clone(),
            value,
            min,
            max,
        }
    }
}

fn join_ints(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered collection of all option declarations
#[derive(Debug, Clone)]
pub struct OptionCatalog {
    specs: IndexMap<String, OptionSpec>,
}

impl OptionCatalog {
    pub fn get(&self, path: &str) -> Option<&OptionSpec> {
        self.specs.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.specs.contains_key(path)
    }

    /// All declarations in panel order
    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Options the processor cannot default on its own
    pub fn required(&self) -> impl Iterator<Item = &OptionSpec> {
        self.iter().filter(|spec| spec.required)
    }

    /// Declarations under a dotted prefix (`export.gltf` matches `export.gltf.*`)
    pub fn under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a OptionSpec> + 'a {
        self.iter().filter(move |spec| is_under(&spec.path, prefix))
    }

    /// Section names in panel order
    pub fn sections(&self) -> Vec<&str> {
        let mut sections: Vec<&str> = Vec::new();
        for spec in self.iter() {
            let section = spec.section();
            if !sections.contains(&section) {
                sections.push(section);
            }
        }
        sections
    }
}

/// True when `path` equals `prefix` or lies below it
pub fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'.')
}

/// The global option catalog
pub fn catalog() -> &'static OptionCatalog {
    static CATALOG: LazyLock<OptionCatalog> = LazyLock::new(build_catalog);
    &CATALOG
}

#[derive(Default)]
struct CatalogBuilder {
    specs: IndexMap<String, OptionSpec>,
}

impl CatalogBuilder {
    fn push(&mut self, path: impl Into<String>, label: &'static str, kind: OptionKind) -> &mut Self {
        let path = path.into();
        self.specs.insert(
            path.clone(),
            OptionSpec {
                path,
                label,
                kind,
                required: false,
            },
        );
        self
    }

    fn flag(&mut self, path: impl Into<String>, label: &'static str, default: bool) -> &mut Self {
        self.push(path, label, OptionKind::Bool { default })
    }

    fn int(&mut self, path: impl Into<String>, label: &'static str, min: i64, max: i64, default: i64) -> &mut Self {
        self.push(path, label, OptionKind::Int { min, max, default })
    }

    fn float(&mut self, path: impl Into<String>, label: &'static str, min: f64, max: f64, default: f64) -> &mut Self {
        self.push(path, label, OptionKind::Float { min, max, default })
    }

    fn choice(
        &mut self,
        path: impl Into<String>,
        label: &'static str,
        allowed: &'static [&'static str],
        default: &'static str,
    ) -> &mut Self {
        self.push(path, label, OptionKind::Choice { allowed, default })
    }

    fn int_choice(
        &mut self,
        path: impl Into<String>,
        label: &'static str,
        allowed: &'static [i64],
        default: i64,
    ) -> &mut Self {
        self.push(path, label, OptionKind::IntChoice { allowed, default })
    }

    /// Mark the most recently declared option as required
    fn required(&mut self) -> &mut Self {
        if let Some((_, spec)) = self.specs.last_mut() {
            spec.required = true;
        }
        self
    }

    fn uv_atlas(&mut self, prefix: &str) -> &mut Self {
        self.choice(format!("{prefix}.uvAtlasMode"), "UV atlas mode", UV_ATLAS_MODES, "single")
            .int_choice(
                format!("{prefix}.packingResolution"),
                "Packing resolution",
                PACKING_RESOLUTIONS,
                2048,
            )
            .int(format!("{prefix}.multipleAtlasFactor"), "Multiple atlas factor", 1, 10, 1)
    }

    fn texture_baker(&mut self, prefix: &str, required: bool) -> &mut Self {
        let p = format!("{prefix}.textureBaker");
        self.flag(format!("{p}.enabled"), "Texture baker", true)
            .int(format!("{p}.sampleCount"), "Sample count", 1, 100, 4)
            .flag(format!("{p}.autoScaling"), "Auto scaling", true)
            .flag(format!("{p}.normalMap"), "Bake normal map", true)
            .flag(format!("{p}.ambientOcclusionMap"), "Bake ambient occlusion", false)
            .int_choice(format!("{p}.bakeResolution"), "Bake resolution", PACKING_RESOLUTIONS, 2048);
        if required {
            self.required();
        }
        self.choice(format!("{p}.baseMapFormat"), "Base map format", TEXTURE_FORMATS, "png");
        if required {
            self.required();
        }
        self
    }

    fn max_texture(&mut self, prefix: &str, enabled: bool) -> &mut Self {
        self.flag(
            format!("{prefix}.maxTextureResolution.enabled"),
            "Limit texture resolution",
            enabled,
        )
        .int(
            format!("{prefix}.maxTextureResolution.value"),
            "Max texture resolution",
            1,
            16384,
            16384,
        )
    }

    fn build(self) -> OptionCatalog {
        OptionCatalog { specs: self.specs }
    }
}

fn build_catalog() -> OptionCatalog {
    let mut b = CatalogBuilder::default();

    // Import
    b.flag("import.general.convertZUpToYUp", "Convert Z-Up to Y-Up", false)
        .flag("import.general.cleanUpAnimationData", "Clean up animation data", false)
        .flag("import.general.normalMapYFlip", "Normal map Y flip", false)
        .choice("import.usd.profile", "USD profile", &["auto", "arkit"], "arkit")
        .choice("import.usd.purpose", "USD purpose", &["auto", "render"], "render")
        .choice("import.cad.tessellationResolution", "CAD tessellation", &["auto", "fine"], "fine")
        .flag("import.discard.cameras", "Discard cameras", false)
        .flag("import.discard.lights", "Discard lights", false)
        .flag("import.discard.animations", "Discard animations", false)
        .flag("import.discard.morphTargets", "Discard morph targets", false)
        .flag("import.discard.unusedUvSets", "Discard unused UV sets", false)
        .int("import.quickPreset.polyCount", "Poly count", 0, 400_000, 20_000)
        .choice(
            "import.quickPreset.surfaceType",
            "Surface type",
            &["hardSurface", "softSurface"],
            "softSurface",
        )
        .choice("import.quickPreset.uvType", "UVs", &["preserveUvs", "autoUvs"], "autoUvs");

    // Scene graph
    b.choice("sceneGraph.flatteningMethod", "Flattening", AUTO_OR_OPACITY, "byOpacity")
        .required()
        .choice("sceneGraph.splitMode", "Compact split mode", AUTO_OR_OPACITY, "byOpacity")
        .required()
        .int("sceneGraph.preserveDepthLevel", "Preserve depth level", 1, 20, 1);

    // Edit
    b.flag("edit.normals.recompute", "Recompute normals", false)
        .float("edit.normals.hardAngleThreshold", "Hard angle threshold", 0.0, 180.0, 60.0)
        .choice("edit.normals.computeMethod", "Compute method", &["area", "full"], "area")
        .flag("edit.model.enabled", "Edit model", false)
        .choice("edit.model.scalingFactor", "Scaling factor", &["inches", "cm", "mm"], "cm")
        .flag("edit.model.centerModel", "Center model", false)
        .flag("edit.material.enabled", "Edit material", false)
        .flag("edit.material.replacer", "Material replacer", false);

    // Culling
    b.flag("culling.occlusion.enabled", "Occlusion culling", false)
        .flag("culling.occlusion.perMesh", "Per mesh", false)
        .flag("culling.smallFeature.enabled", "Small feature culling", false)
        .choice(
            "culling.sizeThreshold.mode",
            "Size threshold",
            &["relativePercentageBbox", "value"],
            "relativePercentageBbox",
        )
        .float("culling.sizeThreshold.relativePercentage", "Relative percentage", 1.0, 100.0, 10.0)
        .float("culling.sizeThreshold.value", "Threshold value", 0.0, 1000.0, 0.0);

    // Optimize
    b.flag("optimize.enabled", "Optimize", true)
        .choice("optimize.type", "Optimization type", &["meshAndMaterial", "material"], "meshAndMaterial")
        .choice(
            "optimize.material.method",
            "Material method",
            &["materialMerger", "keepMaterialAndUvs"],
            "materialMerger",
        )
        .choice("optimize.material.merger.mergingMethod", "Merging method", &["auto", "nothing"], "auto")
        .flag("optimize.material.merger.keepTiledUvs", "Keep tiled UVs", false)
        .float("optimize.material.merger.tilingThreshold", "Tiling threshold", 0.0, 100.0, 1.0)
        .flag("optimize.material.keep.forceRebakeNormalMaps", "Force rebake normal maps", false)
        .choice(
            "optimize.material.keep.textureMaps",
            "Texture maps",
            &["dropUniform", "generateSecondUvAtlas"],
            "dropUniform",
        )
        .uv_atlas("optimize.material.keep")
        .flag("optimize.material.regenerator.enabled", "Material regenerator", true)
        .choice("optimize.material.regenerator.mode", "Regenerator mode", REGENERATOR_MODES, "generateUvAtlas")
        .uv_atlas("optimize.material.regenerator")
        .texture_baker("optimize.material.regenerator", true);

    b.choice("optimize.mesh.method", "Mesh method", &["decimator", "remesher"], "decimator")
        .flag("optimize.mesh.decimator.preserveTopology", "Preserve topology", false)
        .flag("optimize.mesh.decimator.preserveNormals", "Preserve normals", false)
        .flag("optimize.mesh.decimator.preserveMeshBorders", "Preserve mesh borders", true)
        .flag("optimize.mesh.decimator.preserveMaterialBorders", "Preserve material borders", false)
        .flag(
            "optimize.mesh.decimator.collapseUnconnectedVertices",
            "Collapse unconnected vertices",
            true,
        )
        .float(
            "optimize.mesh.decimator.boundaryPreservationFactor",
            "Boundary preservation factor",
            0.0,
            1.0,
            0.5,
        )
        .float(
            "optimize.mesh.decimator.collapseDistanceThreshold",
            "Collapse distance threshold",
            0.0,
            1.0,
            0.01,
        )
        .choice(
            "optimize.mesh.decimator.method",
            "Decimation method",
            &["quadric", "polymeric", "sutaric"],
            "quadric",
        )
        .flag("optimize.mesh.decimator.target.enabled", "Decimation target", true)
        .choice(
            "optimize.mesh.decimator.target.metric",
            "Target metric",
            &["faces", "vertices", "deviation"],
            "faces",
        )
        .choice(
            "optimize.mesh.decimator.target.facesMode",
            "Faces target",
            &["percentage", "value"],
            "percentage",
        )
        .float("optimize.mesh.decimator.target.facesPercentage", "Faces percentage", 1.0, 100.0, 100.0)
        .int("optimize.mesh.decimator.target.facesValue", "Faces value", 0, 1_000_000, 20_000)
        .flag("optimize.mesh.decimator.materialOptimization", "Material optimization", false)
        .choice(
            "optimize.mesh.remesher.method",
            "Remesh method",
            &["voxelization", "shrinkwrap"],
            "voxelization",
        )
        .int("optimize.mesh.remesher.resolution", "Remesh resolution", 0, 10_000, 100)
        .choice("optimize.mesh.remesher.target.metric", "Target metric", &["faces", "vertices"], "faces")
        .flag("optimize.mesh.remesher.materialMerger", "Material merger", false)
        .flag("optimize.mesh.regenerator.enabled", "Mesh regenerator", false)
        .choice("optimize.mesh.regenerator.mode", "Regenerator mode", REGENERATOR_MODES, "generateUvAtlas")
        .choice(
            "optimize.mesh.regenerator.unwrappingMethod",
            "Unwrapping method",
            UNWRAPPING_METHODS,
            "isometric",
        )
        .float("optimize.mesh.regenerator.segmentationCutAngle", "Segmentation cut angle", 1.0, 360.0, 60.0)
        .float(
            "optimize.mesh.regenerator.segmentationChartAngle",
            "Segmentation chart angle",
            1.0,
            360.0,
            180.0,
        )
        .float("optimize.mesh.regenerator.maxAngleError", "Max angle error", 1.0, 360.0, 120.0)
        .int(
            "optimize.mesh.regenerator.maxPrimitivesPerChart",
            "Max primitives per chart",
            1,
            100_000,
            10_000,
        )
        .flag("optimize.mesh.regenerator.cutOverlappingUvPieces", "Cut overlapping UV pieces", false)
        .uv_atlas("optimize.mesh.regenerator")
        .texture_baker("optimize.mesh.regenerator", false);

    // Modifier
    b.flag("modifier.enabled", "Modifier", false)
        .choice("modifier.type", "Modifier type", &["sizeOnScreen", "none"], "sizeOnScreen")
        .float("modifier.sizeOnScreen.pixelTarget", "Pixel target", 1.0, 100_000.0, 1024.0)
        .choice(
            "modifier.sizeOnScreen.powerOfTwoResolution",
            "Power of two resolution",
            &["auto", "none"],
            "none",
        );

    // Export: glTF (shared by glb)
    b.flag("export.gltf.enabled", "glTF / GLB", true)
        .choice(
            "export.gltf.geometryCompression",
            "Geometry compression",
            &["none", "draco", "dracoLossy", "meshQuantization"],
            "none",
        )
        .flag("export.gltf.excludeTangents", "Exclude tangents", true)
        .flag("export.gltf.pbr.separateOcclusionMap", "Separate occlusion map", false)
        .flag("export.gltf.pbr.excludeMaterialExtensions", "Exclude material extensions", false)
        .flag("export.gltf.pbr.forceDoubleSided", "Force double sided", false)
        .flag("export.gltf.pbr.forceUnlit", "Force unlit", false)
        .flag("export.gltf.pbr.convertToMetalRoughness", "Convert to metal roughness", false)
        .max_texture("export.gltf.pbr", true)
        .flag("export.gltf.pbr.textureFormat.enabled", "Override texture format", false)
        .choice("export.gltf.pbr.textureFormat.value", "Texture format", TEXTURE_FORMATS, "png")
        .flag("export.gltf.pbr.textureCompression.enabled", "Texture compression", false)
        .int("export.gltf.pbr.jpeg.quality", "JPEG quality", 1, 100, 90)
        .int("export.gltf.pbr.jpeg.qualityNormals", "JPEG normals quality", 1, 100, 95)
        .int("export.gltf.pbr.webp.quality", "WebP quality", 1, 100, 90)
        .int("export.gltf.pbr.webp.qualityNormals", "WebP normals quality", 1, 100, 95)
        .int("export.gltf.pbr.ktx.compressionSpeed", "KTX compression speed", 1, 10, 2)
        .int("export.gltf.pbr.ktx.quality", "KTX quality", 1, 256, 128)
        .int("export.gltf.draco.positionQuantization", "Draco position bits", 1, 20, 14)
        .int("export.gltf.draco.normalQuantization", "Draco normal bits", 1, 20, 10)
        .int("export.gltf.draco.uvQuantization", "Draco UV bits", 1, 20, 12)
        .int("export.gltf.draco.boneWeightQuantization", "Draco bone weight bits", 1, 20, 12);

    // Export: obj, fbx, usdz
    b.flag("export.obj.enabled", "OBJ", true)
        .int("export.obj.preferredUvChannel", "Preferred UV channel", 0, 10, 0)
        .flag("export.obj.mtl.displacementToNormalMapAlpha", "Displacement to normal alpha", false)
        .max_texture("export.obj.mtl", false);

    b.flag("export.fbx.enabled", "FBX", true)
        .flag("export.fbx.unitConversion", "Unit conversion", true)
        .flag("export.fbx.excludeTangents", "Exclude tangents", true)
        .flag("export.fbx.flipNormalMapY", "Flip normal map Y", false)
        .flag("export.fbx.preferBinary", "Prefer binary", true)
        .max_texture("export.fbx.physicalMaterial", false);

    b.flag("export.usdz.enabled", "USDZ", true)
        .flag("export.usdz.forceDoubleSidedMeshes", "Force double sided meshes", false)
        .max_texture("export.usdz.previewSurface", false);

    b.build()
}
