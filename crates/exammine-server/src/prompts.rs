//! Portuguese prompt templates for each agent.

use exammine_scraper::{InfoRecord, PriceQueryResult};

/// Closing sentence every exam analysis must carry.
pub const EXAM_DISCLAIMER: &str = "Esta análise não substitui a consulta com um profissional de saúde. Procure orientação médica presencial para interpretação completa e conduta adequada.";

/// Answer given when a follow-up question refers to an unknown session.
pub const SESSION_NOT_FOUND_MESSAGE: &str = "Não foi possível encontrar o exame associado a esta sessão. Por favor, envie o exame novamente.";

/// Products listed in the price prompt.
pub const MAX_PROMPT_PRODUCTS: usize = 15;
/// Products listed under "Links para Compra".
pub const MAX_PURCHASE_LINKS: usize = 5;

pub fn exam_analysis(exam_text: &str) -> String {
    format!(
        r#"Você é um assistente médico especializado em interpretação de exames.

Analise o conteúdo a seguir e responda seguindo exatamente esta estrutura de seções:

✅ Resumo geral do exame
Dê um panorama inicial sobre o que foi avaliado no exame.

📊 Principais resultados
Liste os principais marcadores do exame com breves explicações. Destaque os valores alterados com ênfase.

⚠️ Alertas e observações
Se houver valores críticos, explique-os aqui com clareza e sem alarmismo.

💡 Possíveis causas ou hipóteses
Sugira causas prováveis para os resultados alterados, mas sem dar diagnóstico.

🩺 Recomendações gerais
Dê orientações claras sobre como o paciente pode seguir com o caso (ex: procurar médico, mudar hábitos, etc).

Instruções obrigatórias:

Use emojis nos títulos exatamente como está acima.
Utilize negrito para nomes dos exames e valores numéricos importantes.
Escreva de forma leve, gentil e didática.
Não pule nenhum dos 5 blocos.
Ao final, inclua a seguinte observação: "{EXAM_DISCLAIMER}"

EXAME:
{exam_text}
"#
    )
}

pub fn exam_follow_up(exam_text: &str, question: &str) -> String {
    format!(
        r#"Você é um assistente médico especializado em interpretação de exames.

O usuário enviou o seguinte exame médico:

{exam_text}

Agora o usuário fez a seguinte pergunta sobre esse exame:

"{question}"

Instruções:

1. Responda apenas com base nas informações contidas no exame.
2. Se a pergunta se referir a um marcador ou valor específico, destaque esse valor em negrito e explique seu significado.
3. Se a pergunta for sobre uma condição médica relacionada, explique como os valores no exame podem ou não estar associados.
4. Use linguagem clara, didática e acessível, evitando termos técnicos desnecessários.
5. Não dê diagnósticos definitivos, apenas explicações e interpretações dos dados disponíveis.
6. Se a pergunta não puder ser respondida com os dados do exame, indique isso claramente.

Sua resposta deve ser escrita de forma leve, gentil e didática, sem causar alarme desnecessário.
"#
    )
}

/// Prompt built around scraped content, or the knowledge-only fallback.
pub fn medication_info(medication: &str, scraped: Option<&InfoRecord>) -> String {
    match scraped {
        Some(record) => format!(
            r#"Você é um assistente especializado em informações sobre medicamentos.

Abaixo estão informações coletadas de uma fonte confiável sobre o medicamento "{medication}".
Por favor, reformate e organize estas informações em uma resposta clara e didática.

Inclua as seguintes seções:

1. Descrição geral e propósito do medicamento
2. Princípios ativos principais
3. Indicações de uso
4. Contraindicações
5. Efeitos colaterais comuns
6. Interações medicamentosas relevantes (se disponível)
7. Dosagem típica (se disponível)
8. Precauções especiais

Informações coletadas:
{content}

Fonte: {source}

Observação: Esta informação tem caráter educativo e não substitui a orientação de um profissional de saúde ou a bula oficial do medicamento.
"#,
            content = record.content,
            source = record.source,
        ),
        None => format!(
            r#"Você é um assistente especializado em informações sobre medicamentos.

Forneça informações detalhadas sobre o medicamento "{medication}" em português.
Inclua as seguintes informações:

1. Descrição geral e propósito do medicamento
2. Princípios ativos principais
3. Indicações de uso
4. Contraindicações
5. Efeitos colaterais comuns
6. Interações medicamentosas relevantes
7. Dosagem típica (adulto e infantil, se aplicável)
8. Precauções especiais

Sua resposta deve ser informativa, mas também acessível para pacientes sem conhecimento médico avançado.

Importante: Indique claramente que esta informação tem caráter educativo e não substitui a orientação de um profissional de saúde ou a bula oficial do medicamento.
"#
        ),
    }
}

/// Prompt listing scraped prices, or the knowledge-only fallback when none
/// were found.
pub fn medication_prices(medication: &str, prices: &PriceQueryResult) -> String {
    if prices.products.is_empty() {
        return format!(
            r#"Você é um assistente especializado em informações sobre preços de medicamentos no Brasil.

Forneça informações sobre preços e disponibilidade do medicamento "{medication}" em português.
Inclua as seguintes informações:

1. Faixa de preço típica para este medicamento
2. Versões disponíveis (genérico, similar, referência)
3. Diferenças de preço entre as versões
4. Dicas para economizar na compra deste medicamento
5. Programas de desconto disponíveis (se aplicável)
6. Onde encontrar o medicamento pelo melhor preço

Sua resposta deve ser prática e orientada para ajudar o paciente a encontrar o medicamento pelo melhor preço possível.

Importante: Indique claramente que esta informação tem caráter orientativo e que os preços podem variar de acordo com a região e o período.
"#
        );
    }

    let product_lines = prices
        .products
        .iter()
        .take(MAX_PROMPT_PRODUCTS)
        .enumerate()
        .map(|(i, p)| format!("{}. {} - {} - Fonte: {}", i + 1, p.name, p.price_text, p.source))
        .collect::<Vec<_>>()
        .join("\n");
    let sources = if prices.sources.is_empty() {
        "Não especificado".to_owned()
    } else {
        prices.sources.join(", ")
    };

    format!(
        r#"Você é um assistente especializado em informações sobre preços de medicamentos no Brasil.

Abaixo estão informações coletadas sobre preços do medicamento "{medication}" de diferentes fontes.
Por favor, analise estas informações e forneça um resumo claro e útil sobre os preços encontrados.

Inclua:

1. Faixa de preço encontrada (menor e maior preço)
2. Preço médio aproximado
3. Diferenças entre versões do medicamento (genérico, similar, referência), se identificáveis
4. Sugestões para economizar na compra deste medicamento
5. Onde encontrar os melhores preços com base nos dados

Produtos encontrados:
{product_lines}

Fontes consultadas: {sources}

Observação: Os preços podem variar de acordo com a região e período de consulta.
"#
    )
}

/// `## Links para Compra` section for the cheapest products that have a URL.
///
/// Numbering follows the product's position among the first
/// [`MAX_PURCHASE_LINKS`] products, so products without a URL leave a gap.
/// Returns `None` when no products were found.
pub fn purchase_links(prices: &PriceQueryResult) -> Option<String> {
    if prices.products.is_empty() {
        return None;
    }

    let mut section = String::from("\n\n## Links para Compra\n\n");
    for (i, product) in prices.products.iter().take(MAX_PURCHASE_LINKS).enumerate() {
        if let Some(url) = &product.url {
            section.push_str(&format!(
                "{}. [{}]({url}) - {}\n",
                i + 1,
                product.name,
                product.price_text
            ));
        }
    }
    Some(section)
}

pub fn general_question(question: &str) -> String {
    format!(
        r#"Você é um assistente especializado em assuntos relacionados à saúde.

Responda à seguinte pergunta de saúde em português de forma clara e acessível:

"{question}"

Sua resposta deve:
1. Ser baseada em informações médicas precisas
2. Ser compreensível para pessoas sem conhecimento médico avançado
3. Ser equilibrada e não alarmista
4. Incluir ressalvas quando apropriado
5. Sugerir quando seria adequado consultar um profissional de saúde

Lembre-se de que está fornecendo informações gerais, não aconselhamento médico personalizado.
"#
    )
}

#[cfg(test)]
mod tests {
    use exammine_scraper::Product;
    use rust_decimal::Decimal;

    use super::*;

    fn product(name: &str, cents: i64, url: Option<&str>) -> Product {
        Product {
            name: name.to_owned(),
            price: Decimal::new(cents, 2),
            price_text: format!("R$ {},{:02}", cents / 100, cents % 100),
            source: "Drogasil".to_owned(),
            url: url.map(ToOwned::to_owned),
        }
    }

    fn prices(products: Vec<Product>) -> PriceQueryResult {
        PriceQueryResult {
            query: "dipirona".to_owned(),
            sources: vec!["Drogasil".to_owned()],
            products,
        }
    }

    #[test]
    fn exam_prompt_embeds_text_and_disclaimer() {
        let prompt = exam_analysis("Hemoglobina 13,5 g/dL");
        assert!(prompt.contains("EXAME:\nHemoglobina 13,5 g/dL"));
        assert!(prompt.contains(EXAM_DISCLAIMER));
        for heading in ["✅", "📊", "⚠️", "💡", "🩺"] {
            assert!(prompt.contains(heading), "missing {heading}");
        }
    }

    #[test]
    fn follow_up_prompt_quotes_question() {
        let prompt = exam_follow_up("Glicose 92", "Minha glicose está boa?");
        assert!(prompt.contains("Glicose 92"));
        assert!(prompt.contains("\"Minha glicose está boa?\""));
    }

    #[test]
    fn info_prompt_uses_scraped_content_when_present() {
        let record = InfoRecord {
            content: "# Dipirona".to_owned(),
            source: "https://bulas.med.br/x".to_owned(),
        };
        let prompt = medication_info("dipirona", Some(&record));
        assert!(prompt.contains("Informações coletadas:\n# Dipirona"));
        assert!(prompt.contains("Fonte: https://bulas.med.br/x"));

        let fallback = medication_info("dipirona", None);
        assert!(fallback.contains("Forneça informações detalhadas sobre o medicamento \"dipirona\""));
    }

    #[test]
    fn price_prompt_lists_at_most_fifteen_products() {
        let many: Vec<Product> = (1..=20).map(|i| product(&format!("P{i}"), i * 100, None)).collect();
        let prompt = medication_prices("dipirona", &prices(many));
        assert!(prompt.contains("1. P1 - R$ 1,00 - Fonte: Drogasil"));
        assert!(prompt.contains("15. P15 - R$ 15,00 - Fonte: Drogasil"));
        assert!(!prompt.contains("16. P16"));
        assert!(prompt.contains("Fontes consultadas: Drogasil"));
    }

    #[test]
    fn price_prompt_falls_back_without_products() {
        let prompt = medication_prices("dipirona", &prices(vec![]));
        assert!(prompt.contains("Faixa de preço típica"));
    }

    #[test]
    fn purchase_links_skip_products_without_url() {
        let section = purchase_links(&prices(vec![
            product("A", 100, Some("https://a.example")),
            product("B", 200, None),
            product("C", 300, Some("https://c.example")),
        ]))
        .unwrap();
        assert_eq!(
            section,
            "\n\n## Links para Compra\n\n1. [A](https://a.example) - R$ 1,00\n3. [C](https://c.example) - R$ 3,00\n"
        );
    }

    #[test]
    fn purchase_links_limited_to_five_and_absent_without_products() {
        let many: Vec<Product> = (1..=8)
            .map(|i| product(&format!("P{i}"), i * 100, Some("https://x.example")))
            .collect();
        let section = purchase_links(&prices(many)).unwrap();
        assert_eq!(section.matches("https://x.example").count(), 5);
        assert!(purchase_links(&prices(vec![])).is_none());
    }
}
