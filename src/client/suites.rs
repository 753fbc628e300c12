//! Endpoint lists of the TAX and ACCOUNTING modules and how each response is
//! summarised.

use crate::client::Check;
use crate::client::Suite;
use serde_json::Value;

/// Plans listed in the plans-reference check
const PLANS_SHOWN: usize = 3;

pub fn tax_suite() -> Suite {
    Suite {
        name: "TAX",
        checks: vec![
            Check {
                title: "Liste des impôts",
                path: "/api/v1/tax/impots/",
                render: render_impots,
                show_error_body: true,
            },
            Check {
                title: "Filtrer impôts par pays (CI)",
                path: "/api/v1/tax/impots/?pays=CI",
                render: |body| vec![format!("✅ {} impôts pour Côte d'Ivoire", items(body).len())],
                show_error_body: false,
            },
            Check {
                title: "Liste des régimes fiscaux",
                path: "/api/v1/tax/regimes/",
                render: render_regimes,
                show_error_body: false,
            },
            Check {
                title: "Liste des abattements fiscaux",
                path: "/api/v1/tax/abattements/",
                render: render_abattements,
                show_error_body: false,
            },
            Check {
                title: "Statistiques fiscales",
                path: "/api/v1/tax/stats/",
                render: render_stats,
                show_error_body: true,
            },
        ],
    }
}

pub fn accounting_suite() -> Suite {
    Suite {
        name: "ACCOUNTING",
        checks: vec![
            Check {
                title: "Liste des plans comptables de référence",
                path: "/api/v1/accounting/plans-reference/",
                render: render_plans,
                show_error_body: true,
            },
            Check {
                title: "Test alias /plans/ (compatibilité frontend)",
                path: "/api/v1/accounting/plans/",
                render: |body| vec![format!("✅ Alias fonctionne! {} plans comptables", items(body).len())],
                show_error_body: false,
            },
            Check {
                title: "Liste des comptes de référence",
                path: "/api/v1/accounting/comptes-reference/",
                render: render_comptes,
                show_error_body: true,
            },
            Check {
                title: "Liste des journaux comptables",
                path: "/api/v1/accounting/journaux/",
                render: |body| vec![format!("✅ {} journaux trouvés", items(body).len())],
                show_error_body: true,
            },
        ],
    }
}

/// Entries of a list response, plain or paginated (`{"results": [...]}`)
fn items(body: &Value) -> &[Value] {
    match body {
        Value::Array(items) => items,
        Value::Object(object) => object
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    }
}

/// Text of a field: strings unquoted, `N/A` when absent or null
fn text(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(value)) => value.to_owned(),
        Some(Value::Null) | None => "N/A".to_owned(),
        Some(value) => value.to_string(),
    }
}

/// Whether a field holds a value other than null, zero, false or ""
fn is_set(item: &Value, key: &str) -> bool {
    match item.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map(|value| value != 0.0).unwrap_or(true),
        Some(Value::String(value)) => !value.is_empty(),
        Some(Value::Array(values)) => !values.is_empty(),
        Some(Value::Object(values)) => !values.is_empty(),
    }
}

fn render_impots(body: &Value) -> Vec<String> {
    let impots = items(body);
    let mut lines = vec![format!("✅ {} impôts trouvés", impots.len())];
    lines.extend(impots.iter().map(|impot| {
        format!(
            "   - {}: {} ({}%)",
            text(impot, "code"),
            text(impot, "libelle"),
            text(impot, "taux_normal")
        )
    }));
    lines
}

fn render_regimes(body: &Value) -> Vec<String> {
    let regimes = items(body);
    let mut lines = vec![format!("✅ {} régimes fiscaux trouvés", regimes.len())];
    for regime in regimes {
        lines.push(format!("   - {}: {}", text(regime, "code"), text(regime, "libelle")));
        if is_set(regime, "seuil_ca_min") {
            lines.push(format!("     CA min: {} FCFA", text(regime, "seuil_ca_min")));
        }
    }
    lines
}

fn render_abattements(body: &Value) -> Vec<String> {
    let abattements = items(body);
    let mut lines = vec![format!("✅ {} abattements trouvés", abattements.len())];
    lines.extend(abattements.iter().map(|abattement| {
        format!(
            "   - {}: {}% ({})",
            text(abattement, "nom"),
            text(abattement, "valeur"),
            text(abattement, "type_abattement")
        )
    }));
    lines
}

fn render_stats(body: &Value) -> Vec<String> {
    let stats = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
    vec!["✅ Statistiques récupérées".to_owned(), format!("   {stats}")]
}

fn render_plans(body: &Value) -> Vec<String> {
    let plans = items(body);
    let mut lines = vec![format!("✅ {} plans comptables trouvés", plans.len())];
    lines.extend(
        plans
            .iter()
            .take(PLANS_SHOWN)
            .map(|plan| format!("   - {}: {}", text(plan, "code"), text(plan, "nom"))),
    );
    lines
}

fn render_comptes(body: &Value) -> Vec<String> {
    let comptes = items(body);
    let mut lines = vec![format!("✅ {} comptes trouvés", comptes.len())];
    if let Some(compte) = comptes.first() {
        lines.push(format!("   Exemple: {} - {}", text(compte, "numero"), text(compte, "libelle")));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suites_cover_the_endpoints() {
        let tax = tax_suite().checks.iter().map(|check| check.path).collect::<Vec<_>>();
        assert_eq!(tax, vec![
            "/api/v1/tax/impots/",
            "/api/v1/tax/impots/?pays=CI",
            "/api/v1/tax/regimes/",
            "/api/v1/tax/abattements/",
            "/api/v1/tax/stats/",
        ]);
        assert_eq!(accounting_suite().checks.len(), 4);
    }

    #[test]
    fn paginated_and_plain_lists() {
        assert_eq!(items(&json!([1, 2])).len(), 2);
        assert_eq!(items(&json!({ "count": 3, "results": [1, 2, 3] })).len(), 3);
        assert!(items(&json!({ "total": 3 })).is_empty());
        assert!(items(&json!("text")).is_empty());
    }

    #[test]
    fn renders_abattements_and_comptes() {
        let lines = render_abattements(&json!([{ "nom": "Frais professionnels", "valeur": 20, "type_abattement": "POURCENTAGE" }]));
        assert_eq!(lines, vec![
            "✅ 1 abattements trouvés".to_owned(),
            "   - Frais professionnels: 20% (POURCENTAGE)".to_owned(),
        ]);

        let lines = render_comptes(&json!([{ "numero": "101000" }, { "numero": "411000" }]));
        assert_eq!(lines, vec!["✅ 2 comptes trouvés".to_owned(), "   Exemple: 101000 - N/A".to_owned()]);
    }

    #[test]
    fn plans_are_capped() {
        let plans = json!([{ "code": "A" }, { "code": "B" }, { "code": "C" }, { "code": "D" }]);
        let lines = render_plans(&plans);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "✅ 4 plans comptables trouvés");
        assert_eq!(lines[3], "   - C: N/A");
    }

    #[test]
    fn stats_are_pretty_printed() {
        let lines = render_stats(&json!({ "total_impots": 12 }));
        assert_eq!(lines[1], "   {\n  \"total_impots\": 12\n}");
    }
}
