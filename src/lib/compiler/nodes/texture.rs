use super::{NodeCompiler, Sockets};
use crate::{
    compiler::context::{Context, Expression, NodeContext},
    error::{Error, Result},
    types::Type,
};

#[derive(Clone, Copy, Debug, Default)]
/// Sample of a 2D texture. An open `uv` input samples at the fragment's own coordinates.
pub struct TextureCompiler;

impl NodeCompiler for TextureCompiler {
    fn label(&self) -> String {
        "Texture".to_owned()
    }

    fn description(&self) -> String {
        "Sample a texture at the given coordinates".to_owned()
    }

    fn sockets(&self, _context: &NodeContext) -> Result<Sockets> {
        Ok(Sockets::default()
            .input("sampler", Type::Sampler2D)
            .input("uv", Type::VEC2)
            .output("color", Type::VEC4))
    }

    fn compile(&self, context: &NodeContext) -> Result<Context> {
        let sampler = match context.try_get_input("sampler")? {
            Some(sampler) if sampler.r#type == Type::Sampler2D => sampler.data,
            Some(sampler) => {
                return Err(Error::UnsupportedConversion(format!(
                    "cannot sample `{}`",
                    sampler.r#type
                )))
            }
            // Samplers have no default value, so this fails.
            None => Type::Sampler2D.default_expression()?,
        };

        let uv = match context.try_get_input("uv")? {
            Some(uv) if uv.r#type.can_strictly_convert(&Type::VEC2) => uv.data,
            Some(uv) => {
                return Err(Error::UnsupportedConversion(format!(
                    "texture coordinates must be `vec2`, got `{}`",
                    uv.r#type
                )))
            }
            None => "v_uv".to_owned(),
        };

        Ok(Context::default().with_output(
            "color",
            Expression::new(Type::VEC4, format!("texture({sampler}, {uv})")),
        ))
    }
}
