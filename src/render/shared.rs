pub(crate) const MATERIAL_LAMBERT: f32 = 0.0;
pub(crate) const MATERIAL_UNLIT: f32 = 1.0;
pub(crate) const MATERIAL_SKY: f32 = 2.0;

pub(crate) const SHADER: &str = r#"
struct Light {
    direction: vec4<f32>,
    color: vec4<f32>,
}

struct GlobalUniform {
    view_proj: mat4x4<f32>,
    // w holds the number of active lights
    camera_position: vec4<f32>,
    lights: array<Light, 4>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    normal: mat3x4<f32>,
    color: vec4<f32>,
    sky_top: vec4<f32>,
    // x: material, y: sky offset, z: sky exponent
    material: vec4<f32>,
}

const MATERIAL_UNLIT: u32 = 1u;
const MATERIAL_SKY: u32 = 2u;
const AMBIENT: f32 = 0.15;

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> object: ObjectConstants;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world_position = object.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world_position;
    out.world_pos = world_position.xyz;
    out.normal = mat3x3<f32>(
        object.normal[0].xyz,
        object.normal[1].xyz,
        object.normal[2].xyz
    ) * input.normal;
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let material = u32(object.material.x);
    if material == MATERIAL_SKY {
        let h = normalize(input.world_pos + vec3<f32>(object.material.y)).y;
        let t = max(pow(max(h, 0.0), object.material.z), 0.0);
        return vec4<f32>(mix(object.color.rgb, object.sky_top.rgb, t), 1.0);
    }

    let base = object.color.rgb * input.color;
    if material == MATERIAL_UNLIT {
        return vec4<f32>(base, object.color.a);
    }

    let normal = normalize(input.normal);
    var light = vec3<f32>(AMBIENT);
    let count = min(u32(globals.camera_position.w), 4u);
    for (var i = 0u; i < count; i = i + 1u) {
        let source = globals.lights[i];
        let diffuse = max(dot(normal, source.direction.xyz), 0.0);
        light = light + diffuse * source.color.w * source.color.rgb;
    }
    return vec4<f32>(base * light, object.color.a);
}
"#;
