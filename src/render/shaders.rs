//! WGSL sources for the scene and composite pipelines.

const FRAME_BLOCK: &str = r#"
struct PointLight {
    position: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
}

struct SpotLight {
    position: vec4<f32>,
    direction: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
    cone: vec4<f32>,
}

struct FrameUniform {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    view_position: vec4<f32>,
    point_lights: array<PointLight, 3>,
    spot_light: SpotLight,
}

struct ObjectUniform {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
}

@group(0) @binding(0)
var<uniform> frame: FrameUniform;

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = frame.projection * frame.view * world_position;
    out.world_pos = world_position.xyz;

    let world_normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;

    out.normal = normalize(world_normal);
    out.uv = input.uv;
    return out;
}
"#;

const LIT_FRAGMENT: &str = r#"
@group(2) @binding(0)
var diffuse_map: texture_2d<f32>;
@group(2) @binding(1)
var specular_map: texture_2d<f32>;
@group(2) @binding(2)
var material_sampler: sampler;

struct MaterialUniform {
    tint: vec4<f32>,
}

@group(2) @binding(3)
var<uniform> material: MaterialUniform;

fn attenuate(terms: vec4<f32>, dist: f32) -> f32 {
    return 1.0 / (terms.x + terms.y * dist + terms.z * dist * dist);
}

fn point_light(light: PointLight, normal: vec3<f32>, world_pos: vec3<f32>, view_dir: vec3<f32>,
               albedo: vec3<f32>, gloss: vec3<f32>, shininess: f32) -> vec3<f32> {
    let light_dir = normalize(light.position.xyz - world_pos);
    let diff = max(dot(normal, light_dir), 0.0);
    let reflect_dir = reflect(-light_dir, normal);
    let spec = pow(max(dot(view_dir, reflect_dir), 0.0), shininess);
    let falloff = attenuate(light.attenuation, length(light.position.xyz - world_pos));
    let ambient = light.ambient.rgb * albedo;
    let diffuse = light.diffuse.rgb * diff * albedo;
    let specular = light.specular.rgb * spec * gloss;
    return (ambient + diffuse + specular) * falloff;
}

fn spot_light(light: SpotLight, normal: vec3<f32>, world_pos: vec3<f32>, view_dir: vec3<f32>,
              albedo: vec3<f32>, gloss: vec3<f32>, shininess: f32) -> vec3<f32> {
    let light_dir = normalize(light.position.xyz - world_pos);
    let diff = max(dot(normal, light_dir), 0.0);
    let reflect_dir = reflect(-light_dir, normal);
    let spec = pow(max(dot(view_dir, reflect_dir), 0.0), shininess);
    let falloff = attenuate(light.attenuation, length(light.position.xyz - world_pos));
    let theta = dot(light_dir, normalize(-light.direction.xyz));
    let epsilon = light.cone.x - light.cone.y;
    let cone = clamp((theta - light.cone.y) / epsilon, 0.0, 1.0);
    let ambient = light.ambient.rgb * albedo;
    let diffuse = light.diffuse.rgb * diff * albedo;
    let specular = light.specular.rgb * spec * gloss;
    return (ambient + (diffuse + specular) * cone) * falloff;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(diffuse_map, material_sampler, input.uv);
    let albedo = texel.rgb * material.tint.rgb;
    let gloss = textureSample(specular_map, material_sampler, input.uv).rgb;
    let normal = normalize(input.normal);
    let view_dir = normalize(frame.view_position.xyz - input.world_pos);
    let shininess = frame.view_position.w;

    var color = vec3<f32>(0.0);
    for (var i = 0u; i < 3u; i = i + 1u) {
        color += point_light(frame.point_lights[i], normal, input.world_pos, view_dir,
                             albedo, gloss, shininess);
    }
    color += spot_light(frame.spot_light, normal, input.world_pos, view_dir,
                        albedo, gloss, shininess);
    return vec4<f32>(color, texel.a);
}
"#;

const EMISSIVE_FRAGMENT: &str = r#"
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

pub(crate) const COMPOSITE_SHADER: &str = r#"
struct CompositeUniform {
    effect: vec4<f32>,
}

@group(0) @binding(0)
var scene_texture: texture_2d<f32>;
@group(0) @binding(1)
var scene_sampler: sampler;
@group(0) @binding(2)
var<uniform> composite: CompositeUniform;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(scene_texture, scene_sampler, input.uv);
    if (composite.effect.x > 0.5) {
        let luma = 0.2126 * color.r + 0.7152 * color.g + 0.0722 * color.b;
        return vec4<f32>(luma, luma, luma, 1.0);
    }
    return vec4<f32>(color.rgb, 1.0);
}
"#;

/// Shader for surfaces lit by the point lights and the spotlight.
pub(crate) fn lit_shader() -> String {
    format!("{FRAME_BLOCK}{LIT_FRAGMENT}")
}

/// Shader for the light fixtures themselves.
pub(crate) fn emissive_shader() -> String {
    format!("{FRAME_BLOCK}{EMISSIVE_FRAGMENT}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_shaders_share_the_frame_block() {
        for source in [lit_shader(), emissive_shader()] {
            assert!(source.contains("struct FrameUniform"));
            assert_eq!(source.matches("fn vs_main").count(), 1);
            assert_eq!(source.matches("fn fs_main").count(), 1);
        }
    }

    #[test]
    fn only_lit_shader_samples_materials() {
        assert!(lit_shader().contains("@group(2)"));
        assert!(!emissive_shader().contains("@group(2)"));
        assert!(lit_shader().contains("material.tint"));
        assert!(!lit_shader().contains("object.tint"));
    }
}
