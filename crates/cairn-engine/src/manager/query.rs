//! Textual queries over versions

use super::{instrumented, RepositoryManager};
use crate::report::{AttributeInfo, ObjectSchema};
use cairn_core::adapter::{Backend, SortKey};
use cairn_core::errors::Result;
use cairn_core::filter::{parse_filter, parse_order_by, Expr, ExpressionFactory};
use cairn_core::model::Version;
use cairn_core::tuple::Tuple;

impl<B: Backend> RepositoryManager<B> {
    /// Current versions matching `filter_text`, ordered by `order_by_text`
    ///
    /// A blank filter matches everything; a blank order falls back to
    /// handle order. Superseded versions never appear.
    ///
    /// ```text
    /// process_query("'report' ~$ @title and not @missing", "@imported desc")
    /// ```
    ///
    /// # Errors
    ///
    /// Parser with every diagnostic for malformed text, Expression for
    /// ill-typed comparisons, Persistence.
    pub fn process_query(&self, filter_text: &str, order_by_text: &str) -> Result<Vec<Version>> {
        instrumented("process_query", || {
            let factory = ExpressionFactory::<Version>::new()?;
            let filter = if filter_text.trim().is_empty() {
                None
            } else {
                Some(parse_filter(&factory, filter_text)?)
            };
            let mut sort = parse_order_by(&factory, order_by_text)?;
            if sort.is_empty() {
                sort.push(SortKey::asc("handle"));
            }
            self.select_current(filter.as_ref(), &sort)
        })
    }

    /// Current versions matching a prebuilt filter
    ///
    /// # Errors
    ///
    /// Expression for an unknown sort attribute, Persistence.
    pub fn select_current(&self, filter: Option<&Expr<Version>>, sort: &[SortKey]) -> Result<Vec<Version>> {
        let current = self.current_imports()?;
        let mut matches = Vec::new();
        self.live::<Version>()?
            .apply_selection(filter, sort, None, &mut |version| {
                if current.get(&version.handle) == Some(&version.imported) {
                    matches.push(version);
                }
                Ok(true)
            })?;
        tracing::debug!(matches = matches.len(), "query evaluated");
        Ok(matches)
    }

    /// Attributes a query may name, with their types
    ///
    /// # Errors
    ///
    /// Configuration if the version descriptor is malformed.
    pub fn get_object_schema(&self) -> Result<ObjectSchema> {
        let schema = Version::schema()?;
        Ok(ObjectSchema {
            entity: schema.entity(),
            attributes: schema
                .attributes()
                .iter()
                .map(|attr| AttributeInfo {
                    name: attr.name,
                    ty: attr.ty,
                })
                .collect(),
        })
    }
}
