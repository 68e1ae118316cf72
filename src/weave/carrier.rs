use crate::syntax::Param;
use crate::weave::template::{Template, TemplateError, Vars, ACCESSOR_VARS};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CarrierError {
    #[error("carrier type `{0}` must be `[*]import/path.Name`")]
    BadType(String),

    #[error("carrier `{carrier}` accessor: {source}")]
    Accessor {
        carrier: String,
        #[source]
        source: TemplateError,
    },
}

/// A first-parameter type that makes a function eligible for weaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carrier {
    /// Canonical type key, e.g. `context.Context` or `*net/http.Request`.
    type_key: String,
    accessor: Template,
}

impl Carrier {
    pub fn new(type_spec: &str, accessor: Option<&str>) -> Result<Self, CarrierError> {
        let type_key = type_spec.trim().to_string();
        let path = type_key.strip_prefix('*').unwrap_or(&type_key);
        let valid = match path.rsplit_once('.') {
            Some((package, name)) => {
                !package.is_empty()
                    && !package.ends_with('/')
                    && !name.is_empty()
                    && !name.contains('/')
                    && name.chars().all(|c| c.is_alphanumeric() || c == '_')
            }
            None => false,
        };
        if !valid {
            return Err(CarrierError::BadType(type_spec.to_string()));
        }

        let accessor = Template::parse(accessor.unwrap_or("{{.Var}}"), ACCESSOR_VARS).map_err(
            |source| CarrierError::Accessor {
                carrier: type_key.clone(),
                source,
            },
        )?;
        Ok(Self { type_key, accessor })
    }

    /// `context.Context` passed as-is.
    pub fn context() -> Self {
        Self {
            type_key: "context.Context".to_string(),
            accessor: Template::variable("Var"),
        }
    }

    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    pub fn matches(&self, param: &Param) -> bool {
        param.type_key == self.type_key && param.usable_name().is_some()
    }

    /// Expression yielding the context value from parameter `var`.
    pub fn context_expr(&self, var: &str) -> Result<String, TemplateError> {
        let mut vars = Vars::new();
        vars.insert("Var", var.into());
        self.accessor.render(&vars)
    }
}

/// First carrier matching the function's first parameter, with its name.
pub fn match_carrier<'c, 'p>(
    carriers: &'c [Carrier],
    param: Option<&'p Param>,
) -> Option<(&'c Carrier, &'p str)> {
    let param = param?;
    let name = param.usable_name()?;
    carriers
        .iter()
        .find(|carrier| carrier.matches(param))
        .map(|carrier| (carrier, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(names: &[&str], type_key: &str) -> Param {
        Param {
            names: names.iter().map(|n| n.to_string()).collect(),
            type_key: type_key.to_string(),
        }
    }

    #[test]
    fn parses_type_specs() {
        assert!(Carrier::new("context.Context", None).is_ok());
        assert!(Carrier::new("*net/http.Request", Some("{{.Var}}.Context()")).is_ok());
        assert!(Carrier::new("github.com/acme/rpc.Call", None).is_ok());

        for bad in ["Context", "context.", ".Context", "net/http/.Request", "a.b/c"] {
            assert!(
                matches!(Carrier::new(bad, None), Err(CarrierError::BadType(_))),
                "{bad} should be rejected"
            );
        }
        assert!(matches!(
            Carrier::new("context.Context", Some("{{.Ctx}}")),
            Err(CarrierError::Accessor { .. })
        ));
    }

    #[test]
    fn matches_named_first_parameter() {
        let carriers = vec![
            Carrier::context(),
            Carrier::new("*net/http.Request", Some("{{.Var}}.Context()")).unwrap(),
        ];

        let ctx = param(&["ctx"], "context.Context");
        let (carrier, name) = match_carrier(&carriers, Some(&ctx)).unwrap();
        assert_eq!(carrier.context_expr(name).unwrap(), "ctx");

        let req = param(&["r"], "*net/http.Request");
        let (carrier, name) = match_carrier(&carriers, Some(&req)).unwrap();
        assert_eq!(carrier.context_expr(name).unwrap(), "r.Context()");

        assert!(match_carrier(&carriers, Some(&param(&["_"], "context.Context"))).is_none());
        assert!(match_carrier(&carriers, Some(&param(&[], "context.Context"))).is_none());
        assert!(match_carrier(&carriers, Some(&param(&["r"], "net/http.Request"))).is_none());
        assert!(match_carrier(&carriers, None).is_none());
    }
}
