//! System prompt assembly.
//!
//! The prompt is a deterministic function of the business profile and
//! the customer's structured knowledge base. Two deployments with the
//! same inputs produce byte-identical prompts.

use serde::Deserialize;
use uuid::Uuid;

/// Business facts supplied with the deployment trigger.
#[derive(Debug, Clone, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Processed knowledge base attached to the deployment, if the customer
/// uploaded documents during onboarding.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBaseInput {
    pub kb_id: Uuid,
    #[serde(default)]
    pub structured_data: serde_json::Value,
}

pub fn initial_message(business: &BusinessProfile) -> String {
    format!(
        "Hola, bienvenido a {}. ¿En qué puedo ayudarle?",
        business.name
    )
}

pub fn agent_display_name(business: &BusinessProfile) -> String {
    format!("{} - Recepcionista", business.name)
}

pub fn build_system_prompt(
    business: &BusinessProfile,
    knowledge_base: Option<&KnowledgeBaseInput>,
) -> String {
    let kb = knowledge_base
        .map(|kb| kb.structured_data.clone())
        .unwrap_or(serde_json::Value::Null);

    let services = kb["services"]
        .as_array()
        .map(|s| {
            s.iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "diversos servicios".to_string());

    let hours = kb["hours"]
        .as_object()
        .filter(|h| !h.is_empty())
        .map(|h| {
            h.iter()
                .map(|(day, hours)| format!("{}: {}", day, hours.as_str().unwrap_or("")))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_else(|| "lunes a viernes de 9:00 a 18:00".to_string());

    let industry = business.industry.as_deref().unwrap_or("servicios");
    let location = business.address.as_deref().unwrap_or("la ciudad");

    let mut prompt = format!(
        "Eres la recepcionista virtual de {name}, un negocio de {industry} ubicado en {location}.\n\
         \n\
         TU MISIÓN PRINCIPAL:\n\
         1. Responder preguntas sobre servicios, horarios, ubicación y precios\n\
         2. Agendar citas solicitando: nombre completo, teléfono de contacto, fecha y hora preferida\n\
         3. Filtrar spam: si detectas vendedores, encuestas o llamadas irrelevantes, finaliza educadamente\n\
         \n\
         INFORMACIÓN DEL NEGOCIO:\n\
         - Nombre: {name}\n\
         - Servicios principales: {services}\n\
         - Horario de atención: {hours}\n",
        name = business.name,
        industry = industry,
        location = location,
        services = services,
        hours = hours,
    );

    if let Some(address) = &business.address {
        prompt.push_str(&format!("- Dirección: {}\n", address));
    }
    if let Some(phones) = string_list(&kb["contacts"]["phones"]) {
        prompt.push_str(&format!("- Teléfonos de contacto: {}\n", phones));
    }
    if let Some(emails) = string_list(&kb["contacts"]["emails"]) {
        prompt.push_str(&format!("- Emails: {}\n", emails));
    }

    if let Some(faqs) = kb["faqs"].as_array().filter(|f| !f.is_empty()) {
        prompt.push_str("\nPREGUNTAS FRECUENTES:\n");
        let rendered = faqs
            .iter()
            .map(|faq| {
                format!(
                    "P: {}\nR: {}",
                    faq["question"].as_str().unwrap_or(""),
                    faq["answer"].as_str().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        prompt.push_str(&rendered);
        prompt.push('\n');
    }

    if let Some(policies) = kb["policies"].as_object().filter(|p| !p.is_empty()) {
        prompt.push_str("\nPOLÍTICAS IMPORTANTES:\n");
        for (key, value) in policies {
            prompt.push_str(&format!("- {}: {}\n", key, value.as_str().unwrap_or("")));
        }
    }

    prompt.push_str(&format!(
        "\nINSTRUCCIONES DE COMPORTAMIENTO:\n\
         - Sé amable, profesional y eficiente\n\
         - Usa un tono cálido pero conciso\n\
         - Responde en español de España\n\
         - Mensajes cortos: máximo 2-3 frases por turno\n\
         - Si no sabes algo, ofrece transferir a un humano\n\
         - Para agendar citas: confirma TODOS los datos antes de finalizar\n\
         - Si detectas spam (vendedores, encuestas, bromas), despídete educadamente\n\
         \n\
         FORMATO DE AGENDAMIENTO:\n\
         Cuando el cliente quiera agendar:\n\
         1. Pregunta: \"¿Qué día le viene bien?\" (espera respuesta)\n\
         2. Pregunta: \"¿A qué hora prefiere?\" (espera respuesta)\n\
         3. Pregunta: \"¿Puede darme su nombre completo?\" (espera respuesta)\n\
         4. Pregunta: \"¿Y un teléfono de contacto?\" (espera respuesta)\n\
         5. Confirma: \"Perfecto, [nombre], le he agendado para el [día] a las [hora]. Le enviaremos un recordatorio.\"\n\
         \n\
         EJEMPLOS DE INTERACCIÓN:\n\
         Cliente: \"¿A qué hora abren?\"\n\
         Tú: \"Abrimos {hours}. ¿En qué puedo ayudarle?\"\n\
         \n\
         Cliente: \"Quiero pedir cita\"\n\
         Tú: \"Por supuesto. ¿Qué día le vendría bien?\"\n\
         \n\
         DETECCIÓN DE SPAM:\n\
         Si detectas vendedores, encuestas o un tono poco serio, responde:\n\
         \"Disculpe, pero solo atendemos llamadas relacionadas con nuestros servicios. Que tenga buen día.\" (y finaliza)",
        hours = hours,
    ));

    prompt
}

fn string_list(value: &serde_json::Value) -> Option<String> {
    value
        .as_array()
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.iter()
                .filter_map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile() -> BusinessProfile {
        BusinessProfile {
            name: "Clínica Dental Sonrisa".to_string(),
            industry: Some("odontología".to_string()),
            address: Some("Calle Mayor 12, Madrid".to_string()),
        }
    }

    #[test]
    fn prompt_without_knowledge_base_uses_defaults() {
        let prompt = build_system_prompt(&profile(), None);
        assert!(prompt.contains("Clínica Dental Sonrisa"));
        assert!(prompt.contains("diversos servicios"));
        assert!(prompt.contains("lunes a viernes de 9:00 a 18:00"));
        assert!(!prompt.contains("PREGUNTAS FRECUENTES"));
        assert!(!prompt.contains("POLÍTICAS IMPORTANTES"));
    }

    #[test]
    fn prompt_renders_knowledge_base_sections() {
        let kb = KnowledgeBaseInput {
            kb_id: Uuid::new_v4(),
            structured_data: json!({
                "services": ["limpieza", "ortodoncia"],
                "hours": {"lunes": "9:00-17:00"},
                "faqs": [{"question": "¿Aceptan seguro?", "answer": "Sí, los principales."}],
                "contacts": {"phones": ["+34911222333"], "emails": ["info@sonrisa.es"]},
                "policies": {"cancelación": "24 horas de antelación"}
            }),
        };
        let prompt = build_system_prompt(&profile(), Some(&kb));
        assert!(prompt.contains("limpieza, ortodoncia"));
        assert!(prompt.contains("lunes: 9:00-17:00"));
        assert!(prompt.contains("P: ¿Aceptan seguro?"));
        assert!(prompt.contains("R: Sí, los principales."));
        assert!(prompt.contains("+34911222333"));
        assert!(prompt.contains("info@sonrisa.es"));
        assert!(prompt.contains("cancelación: 24 horas de antelación"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let kb = KnowledgeBaseInput {
            kb_id: Uuid::new_v4(),
            structured_data: json!({
                "services": ["limpieza"],
                "policies": {"b": "dos", "a": "uno"}
            }),
        };
        let first = build_system_prompt(&profile(), Some(&kb));
        let second = build_system_prompt(&profile(), Some(&kb));
        assert_eq!(first, second);
    }

    #[test]
    fn greeting_names_the_business() {
        assert_eq!(
            initial_message(&profile()),
            "Hola, bienvenido a Clínica Dental Sonrisa. ¿En qué puedo ayudarle?"
        );
    }
}
